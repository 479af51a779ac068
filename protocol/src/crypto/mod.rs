//! # Cryptographic Primitives
//!
//! Thin, typed wrappers around audited implementations:
//!
//! - **SHA-256** for content fingerprints.
//! - **BLAKE3** (derive-key mode) for transaction ID derivation.
//! - **Ed25519** for record signatures.

pub mod hash;
pub mod keys;

pub use hash::{blake3_hash, domain_separated_hash, sha256, sha256_hex};
pub use keys::{BftxKeypair, BftxPublicKey, BftxSignature, KeyError};
