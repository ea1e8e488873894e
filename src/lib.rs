//! SigLedger - an in-memory ledger where transfers are authorized by signatures
//!
//! A keypair holder proves authorization by signing the canonical
//! `{sender, amount, recipient}` message with secp256k1 ECDSA. The server
//! recomputes the digest, verifies the signature (optionally recovering the
//! signer's key from it) and only then moves the balance.
//!
//! # Architecture
//!
//! ## Cryptography
//! - [`crypto`] - Keypairs, public key encoding and address derivation
//! - [`signature`] - Canonical digest, signing, and the verification schemes
//!
//! ## State
//! - [`ledger`] - Address to account map and the transfer mutation path
//! - [`transaction`] - Transfer request types and gate-ordered validation
//!
//! ## Service & Transport
//! - [`service`] - `get_balance` / `verify` / `submit` façade
//! - [`api`] - HTTP endpoints (feature `api`)
//! - [`seed`] - Demo wallet seeding and console dumps
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;
pub mod signature;

// ============================================================================
// State
// ============================================================================
pub mod ledger;
pub mod transaction;

// ============================================================================
// Service & Transport
// ============================================================================
pub mod seed;
pub mod service;

#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
