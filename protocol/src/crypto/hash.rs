//! # Hashing Utilities
//!
//! Two hash functions, two jobs:
//!
//! - **SHA-256** hashes canonical shipment content. It is the content
//!   fingerprint stored in the reverse index and fed into ID derivation,
//!   and it is what the Tendermint side computes for transaction hashes.
//!
//! - **BLAKE3** in derive-key mode combines a content hash with the chain
//!   salt into a transaction ID. The context string keeps ID derivation in
//!   its own domain: an ID can never equal a plain BLAKE3 digest of the same
//!   input.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data as a fixed-size array.
///
/// # Example
///
/// ```
/// use bftx_protocol::crypto::sha256;
///
/// let hash = sha256(b"BF_TX");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 rendered as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Domain-separated BLAKE3 over several byte slices.
///
/// Uses BLAKE3's `derive_key` mode: the context string selects a distinct
/// internal IV, so digests from different contexts cannot collide even for
/// identical input. Parts are fed sequentially with no separator, so callers
/// must pass fixed-width parts (or length-prefix them) when the boundary
/// between parts matters.
pub fn domain_separated_hash(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
