//! Key and address encoding for SigLedger (secp256k1)

use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{SECRET_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE},
    All, PublicKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A thread-safe, lazily initialized Secp256k1 context shared by signer and verifier.
pub(crate) static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Number of trailing hex characters of the encoded public key that form an address.
pub const ADDRESS_HEX_LEN: usize = 40;

/// Failures while decoding keys, signatures or digests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),
    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(i64),
    #[error("invalid digest encoding: {0}")]
    InvalidDigestEncoding(String),
}

/// Ledger account key: the trailing 40 hex characters of an uncompressed public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wraps a caller-supplied address. Input is trimmed and lower-cased so
    /// lookups match derived addresses; no length check is made here since an
    /// unknown address is simply an absent account.
    pub fn new(s: &str) -> Self {
        Address(s.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::new(s)
    }
}

/// Decodes a hex public key (compressed or uncompressed).
pub fn decode_public_key(public_key_hex: &str) -> Result<PublicKey, DecodeError> {
    let bytes = hex::decode(public_key_hex.trim())
        .map_err(|e| DecodeError::InvalidKeyEncoding(format!("invalid hex: {}", e)))?;
    PublicKey::from_slice(&bytes)
        .map_err(|e| DecodeError::InvalidKeyEncoding(format!("invalid public key: {}", e)))
}

/// Hex encoding of a public key in uncompressed form (`04 || x || y`).
pub fn encode_public_key(public_key: &PublicKey) -> String {
    let bytes: [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE] = public_key.serialize_uncompressed();
    hex::encode(bytes)
}

/// Address of an already decoded public key.
pub fn address_of(public_key: &PublicKey) -> Address {
    let encoded = encode_public_key(public_key);
    Address(encoded[encoded.len() - ADDRESS_HEX_LEN..].to_string())
}

/// Derives the address of a hex-encoded public key.
///
/// The key is parsed and re-encoded uncompressed first, so a compressed
/// encoding of the same point yields the same address.
pub fn derive_address(public_key_hex: &str) -> Result<Address, DecodeError> {
    let public_key = decode_public_key(public_key_hex)?;
    Ok(address_of(&public_key))
}

/// Decodes a hex string of at most `N` bytes into a big-endian, left-padded array.
///
/// Signing clients that print big integers drop leading zeros, so `"ab"` and
/// `"00ab"` decode to the same value.
pub(crate) fn decode_padded_hex<const N: usize>(s: &str) -> Result<[u8; N], String> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Err("empty hex string".to_string());
    }
    if s.len() > N * 2 {
        return Err(format!("expected at most {} hex characters, got {}", N * 2, s.len()));
    }
    let padded = format!("{:0>width$}", s, width = N * 2);
    let mut out = [0u8; N];
    hex::decode_to_slice(&padded, &mut out).map_err(|e| format!("invalid hex: {}", e))?;
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    /// Creates a KeyPair from an existing SecretKey.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from a hex private key, accepting values printed
    /// without leading zeros.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, DecodeError> {
        let bytes = decode_padded_hex::<SECRET_KEY_SIZE>(secret_hex)
            .map_err(DecodeError::InvalidKeyEncoding)?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| DecodeError::InvalidKeyEncoding(format!("invalid secret key: {}", e)))?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    pub fn public_key_hex(&self) -> String {
        encode_public_key(&self.public_key)
    }

    pub fn address(&self) -> Address {
        address_of(&self.public_key)
    }
}
