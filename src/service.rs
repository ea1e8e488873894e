//! Ledger façade consumed by the transport layer: balance, verify, submit

use crate::crypto::Address;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::seed::{accounts_dump, SeededWallet};
use crate::signature::SchemeKind;
use crate::transaction::{TransactionValidator, TransferRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const MSG_INVALID_FIELDS: &str = "All fields are required to complete this transaction.";
pub const MSG_INVALID_KEYS: &str = "The public and private keys are not valid.";
pub const MSG_INVALID_SIGNATURE: &str =
    "A valid signature is required to complete this transaction.";
pub const MSG_INVALID_RECIPIENT: &str =
    "A valid recipient is required to complete this transaction.";
pub const MSG_INVALID_AMOUNT: &str =
    "A whole, non-negative amount is required to complete this transaction.";
pub const MSG_UNKNOWN_SENDER: &str =
    "A funded sender account is required to complete this transaction.";
pub const MSG_INSUFFICIENT_BALANCE: &str =
    "The sender balance is too low to complete this transaction.";
pub const MSG_INVALID_NONCE: &str = "The transaction nonce is not valid for this sender.";
pub const MSG_FAILED: &str = "The transaction could not be completed.";
pub const MSG_VALID_SIGNATURE: &str = "A valid digital signature has been generated and verified.";
pub const MSG_VALID_TRANSACTION: &str = "Your transaction was successful.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `{status, message?, balance?}` as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
}

impl ServiceResponse {
    pub fn success(message: &str) -> Self {
        ServiceResponse {
            status: Status::Success,
            message: Some(message.to_string()),
            balance: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ServiceResponse {
            status: Status::Error,
            message: Some(message.to_string()),
            balance: None,
        }
    }

    pub fn with_balance(mut self, balance: i64) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Client-facing message for a rejection. Never mentions whether the sender
/// exists when the signature is what failed.
pub fn rejection_message(reason: &LedgerError) -> &'static str {
    match reason {
        LedgerError::InvalidFields => MSG_INVALID_FIELDS,
        LedgerError::InvalidKeys => MSG_INVALID_KEYS,
        LedgerError::InvalidSignature => MSG_INVALID_SIGNATURE,
        LedgerError::InvalidRecipient => MSG_INVALID_RECIPIENT,
        LedgerError::InvalidAmount(_) => MSG_INVALID_AMOUNT,
        LedgerError::UnknownSender => MSG_UNKNOWN_SENDER,
        LedgerError::InsufficientBalance { .. } => MSG_INSUFFICIENT_BALANCE,
        LedgerError::InvalidNonce { .. } => MSG_INVALID_NONCE,
        _ => MSG_FAILED,
    }
}

pub struct LedgerService {
    validator: TransactionValidator,
    wallets: Vec<SeededWallet>,
}

impl LedgerService {
    pub fn new(ledger: Arc<Ledger>, scheme: SchemeKind) -> Self {
        LedgerService {
            validator: TransactionValidator::new(ledger, scheme),
            wallets: Vec::new(),
        }
    }

    /// Wallets whose balances are re-printed after every applied transfer.
    pub fn with_wallets(mut self, wallets: Vec<SeededWallet>) -> Self {
        self.wallets = wallets;
        self
    }

    pub fn wallets(&self) -> &[SeededWallet] {
        &self.wallets
    }

    /// Current "Available Accounts" dump for the tracked wallets.
    pub fn accounts_dump(&self) -> String {
        accounts_dump(self.ledger(), &self.wallets)
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        self.validator.ledger()
    }

    pub fn scheme(&self) -> SchemeKind {
        self.validator.scheme()
    }

    /// Always succeeds; unknown addresses report 0.
    pub fn get_balance(&self, address: &str) -> ServiceResponse {
        let balance = self.ledger().balance_of(&Address::new(address));
        ServiceResponse {
            status: Status::Success,
            message: None,
            balance: Some(balance),
        }
    }

    pub fn verify(&self, request: &TransferRequest) -> ServiceResponse {
        match self.validator.verify_signature(request) {
            Ok(()) => ServiceResponse::success(MSG_VALID_SIGNATURE),
            Err(reason) => {
                tracing::info!(reason = reason.code(), "ledger.verify.rejected");
                ServiceResponse::error(rejection_message(&reason))
            }
        }
    }

    pub fn submit(&self, request: &TransferRequest) -> ServiceResponse {
        match self.validator.submit(request) {
            Ok(receipt) => {
                tracing::info!(
                    sender = %receipt.sender,
                    recipient = %receipt.recipient,
                    amount = receipt.amount,
                    sender_balance = receipt.sender_balance,
                    recipient_balance = self.ledger().balance_of(&receipt.recipient),
                    "ledger.transfer.applied"
                );
                if !self.wallets.is_empty() {
                    println!("{}", self.accounts_dump());
                }
                ServiceResponse::success(MSG_VALID_TRANSACTION).with_balance(receipt.sender_balance)
            }
            Err(rejection) => {
                tracing::info!(
                    reason = rejection.reason.code(),
                    stage = ?rejection.stage,
                    "ledger.transfer.rejected"
                );
                ServiceResponse::error(rejection_message(&rejection.reason))
            }
        }
    }
}
