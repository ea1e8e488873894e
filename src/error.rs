//! Error types for SigLedger

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    InvalidFields,
    InvalidSignature,
    InvalidKeys,
    InvalidRecipient,
    InvalidAmount(String),
    UnknownSender,
    InsufficientBalance { balance: i64, amount: i64 },
    InvalidNonce { expected: u64, got: Option<u64> },
    AccountExists(String),
    CryptoError(String),
    ConfigError(String),
    IoError(String),
}

impl LedgerError {
    /// Stable code used in logs, mirrors the rejection taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidFields => "INVALID_FIELDS",
            LedgerError::InvalidSignature => "INVALID_SIGNATURE",
            LedgerError::InvalidKeys => "INVALID_KEYS",
            LedgerError::InvalidRecipient => "INVALID_RECIPIENT",
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::UnknownSender => "UNKNOWN_SENDER",
            LedgerError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LedgerError::InvalidNonce { .. } => "INVALID_NONCE",
            LedgerError::AccountExists(_) => "ACCOUNT_EXISTS",
            LedgerError::CryptoError(_) => "CRYPTO_ERROR",
            LedgerError::ConfigError(_) => "CONFIG_ERROR",
            LedgerError::IoError(_) => "IO_ERROR",
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::InvalidFields => write!(f, "Missing required transaction fields"),
            LedgerError::InvalidSignature => write!(f, "Invalid transaction signature"),
            LedgerError::InvalidKeys => write!(f, "Signature does not match the sender's keys"),
            LedgerError::InvalidRecipient => write!(f, "Recipient account does not exist"),
            LedgerError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            LedgerError::UnknownSender => write!(f, "Sender account does not exist"),
            LedgerError::InsufficientBalance { balance, amount } => write!(
                f,
                "Insufficient balance: account holds {} but transfer requires {}",
                balance, amount
            ),
            LedgerError::InvalidNonce { expected, got } => match got {
                Some(n) => write!(f, "Invalid nonce: expected {}, got {}", expected, n),
                None => write!(f, "Invalid nonce: expected {}, none supplied", expected),
            },
            LedgerError::AccountExists(addr) => write!(f, "Account already exists: {}", addr),
            LedgerError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            LedgerError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            LedgerError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_rejection_names() {
        assert_eq!(LedgerError::InvalidFields.code(), "INVALID_FIELDS");
        assert_eq!(LedgerError::InvalidSignature.code(), "INVALID_SIGNATURE");
        assert_eq!(LedgerError::InvalidKeys.code(), "INVALID_KEYS");
        assert_eq!(LedgerError::InvalidRecipient.code(), "INVALID_RECIPIENT");
    }

    #[test]
    fn test_display_formats() {
        let err = LedgerError::InsufficientBalance {
            balance: 10,
            amount: 30,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: account holds 10 but transfer requires 30"
        );

        let err = LedgerError::InvalidNonce {
            expected: 2,
            got: None,
        };
        assert_eq!(err.to_string(), "Invalid nonce: expected 2, none supplied");
    }
}
