/// Transaction types for SigLedger
use crate::crypto::{decode_padded_hex, Address, DecodeError};
use secp256k1::constants::COMPACT_SIGNATURE_SIZE;
use serde::{Deserialize, Serialize};

/// SHA-256 of the canonical transfer message; the value actually signed.
pub type TxDigest = [u8; 32];

/// Signature as it travels on the wire.
///
/// Either the `{r, s}` object printed by elliptic-style clients (hex without
/// leading zeros is accepted) or one compact `r || s` hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireSignature {
    Components {
        #[serde(default)]
        r: String,
        #[serde(default)]
        s: String,
    },
    Compact(String),
}

impl WireSignature {
    /// Both components are present and non-empty.
    pub fn is_complete(&self) -> bool {
        match self {
            WireSignature::Components { r, s } => !r.trim().is_empty() && !s.trim().is_empty(),
            WireSignature::Compact(sig) => !sig.trim().is_empty(),
        }
    }

    /// Decodes into the 64-byte compact form expected by secp256k1.
    pub fn to_compact(&self) -> Result<[u8; COMPACT_SIGNATURE_SIZE], DecodeError> {
        match self {
            WireSignature::Components { r, s } => {
                let r = decode_padded_hex::<32>(r).map_err(DecodeError::InvalidSignatureEncoding)?;
                let s = decode_padded_hex::<32>(s).map_err(DecodeError::InvalidSignatureEncoding)?;
                let mut compact = [0u8; COMPACT_SIGNATURE_SIZE];
                compact[..32].copy_from_slice(&r);
                compact[32..].copy_from_slice(&s);
                Ok(compact)
            }
            WireSignature::Compact(sig) => {
                let sig = sig.trim();
                if sig.len() != COMPACT_SIGNATURE_SIZE * 2 {
                    return Err(DecodeError::InvalidSignatureEncoding(format!(
                        "compact signature must be {} hex characters, got {}",
                        COMPACT_SIGNATURE_SIZE * 2,
                        sig.len()
                    )));
                }
                let mut compact = [0u8; COMPACT_SIGNATURE_SIZE];
                hex::decode_to_slice(sig, &mut compact)
                    .map_err(|e| DecodeError::InvalidSignatureEncoding(e.to_string()))?;
                Ok(compact)
            }
        }
    }

    pub fn from_compact(compact: &[u8; COMPACT_SIGNATURE_SIZE]) -> Self {
        WireSignature::Components {
            r: hex::encode(&compact[..32]),
            s: hex::encode(&compact[32..]),
        }
    }
}

/// Transfer request as submitted by a client to `/verify` or `/send`.
///
/// Every field defaults to empty so an incomplete body reaches the field
/// completeness gate instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferRequest {
    pub sender: String,
    pub amount: String,
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<WireSignature>,
    /// Recovery id for the recovery-based scheme. Kept wide so out-of-range
    /// values reach the verifier and fail closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery: Option<i64>,
    /// Hex digest the client signed; cross-checked by the recovery scheme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
}

impl TransferRequest {
    pub fn new(sender: &str, amount: &str, recipient: &str) -> Self {
        TransferRequest {
            sender: sender.to_string(),
            amount: amount.to_string(),
            recipient: recipient.to_string(),
            ..Default::default()
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn sender_address(&self) -> Address {
        Address::new(&self.sender)
    }

    pub fn recipient_address(&self) -> Address {
        Address::new(&self.recipient)
    }

    /// The fields covered by the signature, in signing order.
    pub fn canonical(&self) -> CanonicalTransfer<'_> {
        CanonicalTransfer {
            sender: &self.sender,
            amount: &self.amount,
            recipient: &self.recipient,
            nonce: self.nonce,
        }
    }

    /// Sender, recipient, amount and both signature components are present.
    pub fn has_required_fields(&self) -> bool {
        let present = |s: &str| !s.trim().is_empty();
        present(&self.sender)
            && present(&self.recipient)
            && present(&self.amount)
            && self.signature.as_ref().is_some_and(WireSignature::is_complete)
    }

    /// Recovery id and transmitted digest are present.
    pub fn has_recovery_fields(&self) -> bool {
        self.recovery.is_some() && self.digest.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    /// Coerces the string amount into ledger units.
    ///
    /// Accepts a trimmed, non-negative decimal integer that fits in `i64`.
    pub fn parse_amount(&self) -> Result<i64, String> {
        let raw = self.amount.trim();
        if raw.is_empty() {
            return Err("amount is empty".to_string());
        }
        if raw.starts_with('-') {
            return Err(format!("amount must not be negative: {}", raw));
        }
        let digits = raw.strip_prefix('+').unwrap_or(raw);
        if !digits.chars().all(|c| c.is_ascii_digit()) || digits.is_empty() {
            return Err(format!("amount must be a whole number: {}", raw));
        }
        digits
            .parse::<i64>()
            .map_err(|_| format!("amount out of range: {}", raw))
    }
}

/// Canonical signed message: `{"sender":..,"amount":..,"recipient":..}`.
///
/// Field order is fixed by declaration order; `nonce` is appended only when set.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CanonicalTransfer<'a> {
    pub sender: &'a str,
    pub amount: &'a str,
    pub recipient: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
}

impl CanonicalTransfer<'_> {
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing borrowed strings and an integer into a Vec cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
