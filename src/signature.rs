//! Signing and verification over the canonical transfer digest
//!
//! Two verification schemes are supported behind [`SignatureScheme`]:
//! - [`PublicKeyScheme`] checks `(r, s)` against the sender's stored public key.
//! - [`RecoveryScheme`] recovers the signer's key from the signature and a
//!   recovery id, so no stored key is needed.
//!
//! Every verification path fails closed: decode problems surface as
//! [`DecodeError`] internally and are collapsed to `false` before they reach
//! the validator.

use crate::crypto::{address_of, decode_public_key, Address, DecodeError, KeyPair, SECP256K1_CONTEXT};
use crate::ledger::Ledger;
use crate::transaction::{TransferRequest, TxDigest, WireSignature};
use secp256k1::constants::COMPACT_SIGNATURE_SIZE;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, PublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Hashes the canonical `{sender, amount, recipient}` message with SHA-256.
pub fn canonical_digest(request: &TransferRequest) -> TxDigest {
    Sha256::digest(request.canonical().to_bytes()).into()
}

/// A compact signature together with the index of the matching public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableComponents {
    pub signature: [u8; COMPACT_SIGNATURE_SIZE],
    pub recovery_id: u8,
}

/// Deterministic (RFC6979) low-S ECDSA signature over `digest`.
pub fn sign(keypair: &KeyPair, digest: &TxDigest) -> WireSignature {
    let message = Message::from_digest(*digest);
    let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &keypair.secret_key);
    WireSignature::from_compact(&signature.serialize_compact())
}

/// Signs `digest` and reports the recovery id of the signer's key.
pub fn sign_recoverable(keypair: &KeyPair, digest: &TxDigest) -> RecoverableComponents {
    let message = Message::from_digest(*digest);
    let signature = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&message, &keypair.secret_key);
    let (recovery_id, compact) = signature.serialize_compact();
    RecoverableComponents {
        signature: compact,
        // libsecp256k1 only ever yields ids in 0..=3
        recovery_id: recovery_id.to_i32() as u8,
    }
}

/// Standard ECDSA verification. High-S signatures are normalized first.
pub fn verify(public_key: &PublicKey, digest: &TxDigest, signature: &WireSignature) -> bool {
    try_verify(public_key, digest, signature).unwrap_or(false)
}

pub fn try_verify(
    public_key: &PublicKey,
    digest: &TxDigest,
    signature: &WireSignature,
) -> Result<bool, DecodeError> {
    let compact = signature.to_compact()?;
    let mut signature = Signature::from_compact(&compact)
        .map_err(|e| DecodeError::InvalidSignatureEncoding(e.to_string()))?;
    signature.normalize_s();
    let message = Message::from_digest(*digest);
    Ok(SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, public_key)
        .is_ok())
}

/// Recovers the public key that produced `signature` over `digest`.
pub fn recover_public_key(
    digest: &TxDigest,
    signature: &WireSignature,
    recovery_id: i64,
) -> Result<PublicKey, DecodeError> {
    if !(0..=3).contains(&recovery_id) {
        return Err(DecodeError::InvalidRecoveryId(recovery_id));
    }
    let recovery = RecoveryId::from_i32(recovery_id as i32)
        .map_err(|_| DecodeError::InvalidRecoveryId(recovery_id))?;
    let compact = signature.to_compact()?;
    let recoverable = RecoverableSignature::from_compact(&compact, recovery)
        .map_err(|e| DecodeError::InvalidSignatureEncoding(e.to_string()))?;
    let message = Message::from_digest(*digest);
    SECP256K1_CONTEXT
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| DecodeError::InvalidSignatureEncoding(format!("recovery failed: {}", e)))
}

/// Recovery-based verification. Never panics or errors; any malformed input is `false`.
pub fn verify_by_recovery(
    digest: &TxDigest,
    transmitted_digest: &str,
    signature: &WireSignature,
    recovery_id: i64,
    expected_owner: &Address,
) -> bool {
    match try_verify_by_recovery(digest, transmitted_digest, signature, recovery_id, expected_owner) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::debug!(error = %e, "signature.recovery.decode_failed");
            false
        }
    }
}

pub fn try_verify_by_recovery(
    digest: &TxDigest,
    transmitted_digest: &str,
    signature: &WireSignature,
    recovery_id: i64,
    expected_owner: &Address,
) -> Result<bool, DecodeError> {
    let mut transmitted = [0u8; 32];
    hex::decode_to_slice(transmitted_digest.trim(), &mut transmitted)
        .map_err(|e| DecodeError::InvalidDigestEncoding(e.to_string()))?;
    if &transmitted != digest {
        return Ok(false);
    }

    let public_key = recover_public_key(digest, signature, recovery_id)?;
    if &address_of(&public_key) != expected_owner {
        return Ok(false);
    }

    try_verify(&public_key, digest, signature)
}

/// Which verification scheme a validator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemeKind {
    PublicKey,
    #[default]
    Recovery,
}

impl SchemeKind {
    pub fn build(self) -> Box<dyn SignatureScheme> {
        match self {
            SchemeKind::PublicKey => Box::new(PublicKeyScheme),
            SchemeKind::Recovery => Box::new(RecoveryScheme),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeKind::PublicKey => "public-key",
            SchemeKind::Recovery => "recovery",
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "public-key" => Ok(SchemeKind::PublicKey),
            "recovery" => Ok(SchemeKind::Recovery),
            other => Err(format!(
                "unknown signature scheme '{}' (expected 'public-key' or 'recovery')",
                other
            )),
        }
    }
}

/// Verification capability selected at construction time.
pub trait SignatureScheme: Send + Sync {
    fn kind(&self) -> SchemeKind;

    /// Whether requests must also carry `recovery` and `digest`.
    fn requires_recovery_fields(&self) -> bool {
        false
    }

    /// Checks the request's signature against the recomputed `digest`.
    fn check(
        &self,
        request: &TransferRequest,
        digest: &TxDigest,
        ledger: &Ledger,
    ) -> Result<bool, DecodeError>;

    /// [`SignatureScheme::check`] collapsed to `false` on any decode failure.
    fn verify_request(&self, request: &TransferRequest, digest: &TxDigest, ledger: &Ledger) -> bool {
        match self.check(request, digest, ledger) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::debug!(scheme = %self.kind(), error = %e, "signature.decode_failed");
                false
            }
        }
    }
}

/// Verifies against the public key stored on the sender's account.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublicKeyScheme;

impl SignatureScheme for PublicKeyScheme {
    fn kind(&self) -> SchemeKind {
        SchemeKind::PublicKey
    }

    fn check(
        &self,
        request: &TransferRequest,
        digest: &TxDigest,
        ledger: &Ledger,
    ) -> Result<bool, DecodeError> {
        let Some(signature) = request.signature.as_ref() else {
            return Ok(false);
        };
        // Unknown sender and sender without a stored key look the same as a bad signature.
        let Some(public_key_hex) = ledger.public_key_of(&request.sender_address()) else {
            return Ok(false);
        };
        let public_key = decode_public_key(&public_key_hex)?;
        try_verify(&public_key, digest, signature)
    }
}

/// Recovers the signer from `(digest, signature, recovery)` and matches it to the sender.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveryScheme;

impl SignatureScheme for RecoveryScheme {
    fn kind(&self) -> SchemeKind {
        SchemeKind::Recovery
    }

    fn requires_recovery_fields(&self) -> bool {
        true
    }

    fn check(
        &self,
        request: &TransferRequest,
        digest: &TxDigest,
        ledger: &Ledger,
    ) -> Result<bool, DecodeError> {
        let (Some(signature), Some(recovery_id), Some(transmitted)) = (
            request.signature.as_ref(),
            request.recovery,
            request.digest.as_deref(),
        ) else {
            return Ok(false);
        };
        // A sender without an account fails here, never at a later gate.
        let sender = request.sender_address();
        if !ledger.contains(&sender) {
            return Ok(false);
        }
        try_verify_by_recovery(digest, transmitted, signature, recovery_id, &sender)
    }
}

/// Fills in the signature fields of `request` for the given scheme.
///
/// The recovery scheme also attaches the recovery id and the signed digest.
pub fn sign_transfer(keypair: &KeyPair, mut request: TransferRequest, kind: SchemeKind) -> TransferRequest {
    let digest = canonical_digest(&request);
    match kind {
        SchemeKind::PublicKey => {
            request.signature = Some(sign(keypair, &digest));
        }
        SchemeKind::Recovery => {
            let signed = sign_recoverable(keypair, &digest);
            request.signature = Some(WireSignature::from_compact(&signed.signature));
            request.recovery = Some(i64::from(signed.recovery_id));
            request.digest = Some(hex::encode(digest));
        }
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_for(sender: &KeyPair, amount: &str, recipient: &str) -> TransferRequest {
        TransferRequest::new(sender.address().as_str(), amount, recipient)
    }

    #[test]
    fn test_canonical_message_layout() {
        let request = TransferRequest::new("a", "1", "b");
        assert_eq!(
            request.canonical().to_bytes(),
            br#"{"sender":"a","amount":"1","recipient":"b"}"#.to_vec()
        );
        let expected: TxDigest = Sha256::digest(br#"{"sender":"a","amount":"1","recipient":"b"}"#).into();
        assert_eq!(canonical_digest(&request), expected);

        let with_nonce = request.with_nonce(4);
        assert_eq!(
            with_nonce.canonical().to_bytes(),
            br#"{"sender":"a","amount":"1","recipient":"b","nonce":4}"#.to_vec()
        );
    }

    #[test]
    fn test_digest_ignores_inbound_key_order_and_whitespace() {
        let a: TransferRequest =
            serde_json::from_str(r#"{"sender":"aa","amount":"5","recipient":"bb"}"#).unwrap();
        let b: TransferRequest = serde_json::from_str(
            r#"{
                "recipient" : "bb",
                "amount"    : "5",
                "sender"    : "aa"
            }"#,
        )
        .unwrap();
        assert_eq!(canonical_digest(&a), canonical_digest(&b));
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        let digest = canonical_digest(&request_for(&keypair, "10", "bob"));

        let signature = sign(&keypair, &digest);
        assert!(verify(&keypair.public_key, &digest, &signature));
        assert!(!verify(&other.public_key, &digest, &signature));
    }

    #[test]
    fn test_verify_accepts_unpadded_components() {
        let keypair = KeyPair::generate();
        let digest = canonical_digest(&request_for(&keypair, "10", "bob"));
        let WireSignature::Components { r, s } = sign(&keypair, &digest) else {
            panic!("expected components");
        };
        let unpadded = WireSignature::Components {
            r: r.trim_start_matches('0').to_string(),
            s: s.trim_start_matches('0').to_string(),
        };
        assert!(verify(&keypair.public_key, &digest, &unpadded));
    }

    #[test]
    fn test_recovery_with_correct_id_only() {
        let keypair = KeyPair::generate();
        let request = request_for(&keypair, "30", "bob");
        let digest = canonical_digest(&request);
        let signed = sign_recoverable(&keypair, &digest);
        let signature = WireSignature::from_compact(&signed.signature);
        let transmitted = hex::encode(digest);
        let owner = keypair.address();

        assert!(verify_by_recovery(
            &digest,
            &transmitted,
            &signature,
            i64::from(signed.recovery_id),
            &owner
        ));

        for candidate in (0..4).filter(|id| *id != i64::from(signed.recovery_id)) {
            assert!(!verify_by_recovery(&digest, &transmitted, &signature, candidate, &owner));
        }
    }

    #[test]
    fn test_recovery_fails_closed_on_malformed_input() {
        let keypair = KeyPair::generate();
        let digest = canonical_digest(&request_for(&keypair, "30", "bob"));
        let signed = sign_recoverable(&keypair, &digest);
        let signature = WireSignature::from_compact(&signed.signature);
        let transmitted = hex::encode(digest);
        let owner = keypair.address();
        let id = i64::from(signed.recovery_id);

        assert!(!verify_by_recovery(&digest, &transmitted, &signature, 4, &owner));
        assert!(!verify_by_recovery(&digest, &transmitted, &signature, -1, &owner));
        assert!(!verify_by_recovery(&digest, "zz", &signature, id, &owner));
        assert!(!verify_by_recovery(&digest, &transmitted[2..], &signature, id, &owner));

        let short = WireSignature::Compact(hex::encode(&signed.signature[1..]));
        assert!(!verify_by_recovery(&digest, &transmitted, &short, id, &owner));
        assert!(matches!(
            try_verify_by_recovery(&digest, &transmitted, &short, id, &owner),
            Err(DecodeError::InvalidSignatureEncoding(_))
        ));

        let garbage = WireSignature::Components {
            r: "not-hex".to_string(),
            s: "00".to_string(),
        };
        assert!(!verify_by_recovery(&digest, &transmitted, &garbage, id, &owner));
    }

    #[test]
    fn test_recovery_rejects_substituted_digest() {
        let keypair = KeyPair::generate();
        let digest = canonical_digest(&request_for(&keypair, "30", "bob"));
        let signed = sign_recoverable(&keypair, &digest);
        let signature = WireSignature::from_compact(&signed.signature);
        let other_digest = hex::encode(canonical_digest(&request_for(&keypair, "31", "bob")));

        assert!(!verify_by_recovery(
            &digest,
            &other_digest,
            &signature,
            i64::from(signed.recovery_id),
            &keypair.address()
        ));
    }

    #[test]
    fn test_recovery_rejects_other_owner() {
        let keypair = KeyPair::generate();
        let digest = canonical_digest(&request_for(&keypair, "30", "bob"));
        let signed = sign_recoverable(&keypair, &digest);
        let signature = WireSignature::from_compact(&signed.signature);

        assert!(!verify_by_recovery(
            &digest,
            &hex::encode(digest),
            &signature,
            i64::from(signed.recovery_id),
            &KeyPair::generate().address()
        ));
    }

    #[test]
    fn test_tampering_any_field_breaks_both_schemes() {
        let ledger = Ledger::new();
        let keypair = KeyPair::generate();
        let recipient = KeyPair::generate().address();
        ledger
            .open_account(
                crate::ledger::Account::with_public_key(&keypair.public_key_hex(), 100).unwrap(),
            )
            .unwrap();

        for kind in [SchemeKind::PublicKey, SchemeKind::Recovery] {
            let scheme = kind.build();
            let signed = sign_transfer(
                &keypair,
                TransferRequest::new(keypair.address().as_str(), "30", recipient.as_str()),
                kind,
            );
            assert!(scheme.verify_request(&signed, &canonical_digest(&signed), &ledger));

            let mut tampered = vec![signed.clone(), signed.clone(), signed.clone()];
            tampered[0].sender = KeyPair::generate().address().to_string();
            tampered[1].amount = "300".to_string();
            tampered[2].recipient = KeyPair::generate().address().to_string();

            for t in &tampered {
                assert!(!scheme.verify_request(t, &canonical_digest(t), &ledger), "{kind}");
            }
        }
    }

    #[test]
    fn test_public_key_scheme_unknown_sender_is_false() {
        let ledger = Ledger::new();
        let keypair = KeyPair::generate();
        let signed = sign_transfer(
            &keypair,
            TransferRequest::new(keypair.address().as_str(), "1", "bob"),
            SchemeKind::PublicKey,
        );
        assert!(!PublicKeyScheme.verify_request(&signed, &canonical_digest(&signed), &ledger));
    }

    #[test]
    fn test_recovery_scheme_unknown_sender_is_false() {
        let ledger = Ledger::new();
        let keypair = KeyPair::generate();
        let signed = sign_transfer(
            &keypair,
            TransferRequest::new(keypair.address().as_str(), "1", "bob"),
            SchemeKind::Recovery,
        );
        let digest = canonical_digest(&signed);

        // The recovered key matches the claimed address; only membership is missing
        assert!(verify_by_recovery(
            &digest,
            signed.digest.as_deref().unwrap(),
            signed.signature.as_ref().unwrap(),
            signed.recovery.unwrap(),
            &keypair.address()
        ));
        assert!(!RecoveryScheme.verify_request(&signed, &digest, &ledger));
    }

    #[test]
    fn test_scheme_kind_parsing() {
        assert_eq!("recovery".parse::<SchemeKind>().unwrap(), SchemeKind::Recovery);
        assert_eq!("public-key".parse::<SchemeKind>().unwrap(), SchemeKind::PublicKey);
        assert!("rsa".parse::<SchemeKind>().is_err());
        assert_eq!(SchemeKind::default(), SchemeKind::Recovery);
    }
}
