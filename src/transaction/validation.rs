/// Gate-ordered validation of transfer requests, separated from type definitions
use crate::crypto::Address;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::signature::{canonical_digest, SchemeKind, SignatureScheme};
use crate::transaction::types::TransferRequest;
use std::sync::Arc;

/// Position of a request in the validation pipeline.
///
/// Gates run strictly in declaration order; each is cheaper than the next,
/// and the recipient lookup must not run for unauthenticated callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationStage {
    Received,
    FieldsChecked,
    SignatureChecked,
    RecipientChecked,
    Applied,
}

impl ValidationStage {
    fn next(self) -> Self {
        match self {
            ValidationStage::Received => ValidationStage::FieldsChecked,
            ValidationStage::FieldsChecked => ValidationStage::SignatureChecked,
            ValidationStage::SignatureChecked => ValidationStage::RecipientChecked,
            ValidationStage::RecipientChecked | ValidationStage::Applied => ValidationStage::Applied,
        }
    }
}

/// Terminal rejection: the last stage passed and the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub stage: ValidationStage,
    pub reason: LedgerError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub sender: Address,
    pub recipient: Address,
    pub amount: i64,
    pub sender_balance: i64,
}

pub struct TransactionValidator {
    ledger: Arc<Ledger>,
    scheme: Box<dyn SignatureScheme>,
}

impl TransactionValidator {
    pub fn new(ledger: Arc<Ledger>, kind: SchemeKind) -> Self {
        Self::with_scheme(ledger, kind.build())
    }

    pub fn with_scheme(ledger: Arc<Ledger>, scheme: Box<dyn SignatureScheme>) -> Self {
        TransactionValidator { ledger, scheme }
    }

    pub fn scheme(&self) -> SchemeKind {
        self.scheme.kind()
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    fn fields_complete(&self, request: &TransferRequest) -> bool {
        request.has_required_fields()
            && (!self.scheme.requires_recovery_fields() || request.has_recovery_fields())
    }

    fn signature_valid(&self, request: &TransferRequest) -> bool {
        let digest = canonical_digest(request);
        self.scheme.verify_request(request, &digest, &self.ledger)
    }

    /// Signature gate only. Never touches balances or checks the recipient.
    pub fn verify_signature(&self, request: &TransferRequest) -> Result<(), LedgerError> {
        if request.signature.is_none() || !self.signature_valid(request) {
            return Err(LedgerError::InvalidKeys);
        }
        Ok(())
    }

    /// Runs every gate in order and applies the transfer exactly once if all pass.
    pub fn submit(&self, request: &TransferRequest) -> Result<TransferReceipt, Rejection> {
        let mut stage = ValidationStage::Received;
        let reject = |stage: ValidationStage, reason: LedgerError| {
            tracing::debug!(stage = ?stage, reason = reason.code(), "transaction.rejected");
            Rejection { stage, reason }
        };

        if !self.fields_complete(request) {
            return Err(reject(stage, LedgerError::InvalidFields));
        }
        stage = stage.next();

        if !self.signature_valid(request) {
            return Err(reject(stage, LedgerError::InvalidSignature));
        }
        stage = stage.next();

        let recipient = request.recipient_address();
        if !self.ledger.contains(&recipient) {
            return Err(reject(stage, LedgerError::InvalidRecipient));
        }
        stage = stage.next();

        let amount = request
            .parse_amount()
            .map_err(|msg| reject(stage, LedgerError::InvalidAmount(msg)))?;
        let sender = request.sender_address();
        let sender_balance = self
            .ledger
            .apply_transfer(&sender, &recipient, amount, request.nonce)
            .map_err(|e| reject(stage, e))?;
        stage = stage.next();

        tracing::trace!(stage = ?stage, "transaction.stage");
        Ok(TransferReceipt {
            sender,
            recipient,
            amount,
            sender_balance,
        })
    }
}
