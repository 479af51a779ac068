//! Transaction ID derivation.
//!
//! `id = hex(BLAKE3-derive-key(ctx, SHA-256(canonical content) || salt))`
//! where the salt is the latest committed application hash read from the
//! chain at construction time. A fixed (content, salt) pair always yields
//! the same ID; the same content constructed after the chain has moved on
//! yields a different one, which binds every record to the chain state it
//! was created against.

use thiserror::Error;

use super::content::{ContentError, ShipmentContent};
use crate::config::ID_DERIVATION_CONTEXT;
use crate::crypto::hash::domain_separated_hash;
use crate::network::{ChainClient, NetworkError};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("could not read chain salt: {0}")]
    ChainUnavailable(#[from] NetworkError),
}

/// Combine a content hash and a chain salt into a transaction ID.
///
/// The content hash is fixed-width, so the boundary between the two inputs
/// is unambiguous for any salt length.
pub fn derive_id(content_hash: &[u8; 32], salt: &[u8]) -> String {
    hex::encode(domain_separated_hash(
        ID_DERIVATION_CONTEXT,
        &[content_hash.as_slice(), salt],
    ))
}

/// Generate the ID for `content` against the current chain state.
///
/// Performs one synchronous `info` read on `chain`. The content is hashed
/// first so malformed content never costs a network round trip.
pub fn generate_id<C>(content: &ShipmentContent, chain: &C) -> Result<String, IdentityError>
where
    C: ChainClient + ?Sized,
{
    let content_hash = content.content_hash()?;
    let salt = chain.latest_app_hash()?;
    tracing::debug!(salt = %hex::encode(&salt), "chain salt read for id derivation");
    Ok(derive_id(&content_hash, &salt))
}

/// Returns `true` if `id` has the shape of a derived ID (64 lowercase hex
/// characters).
pub fn is_well_formed_id(id: &str) -> bool {
    id.len() == crate::config::ID_HEX_LENGTH
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::sha256;
    use crate::transaction::content::Properties;

    #[test]
    fn derivation_is_deterministic_for_fixed_salt() {
        let hash = sha256(b"content");
        assert_eq!(derive_id(&hash, &[0xAA]), derive_id(&hash, &[0xAA]));
    }

    #[test]
    fn different_salt_gives_different_id() {
        let hash = sha256(b"content");
        assert_ne!(derive_id(&hash, &[0xAA]), derive_id(&hash, &[0xAB]));
        assert_ne!(derive_id(&hash, &[]), derive_id(&hash, &[0x00]));
    }

    #[test]
    fn different_content_gives_different_id() {
        let a = ShipmentContent::new(Properties::new("A", "B"))
            .content_hash()
            .unwrap();
        let b = ShipmentContent::new(Properties::new("A", "C"))
            .content_hash()
            .unwrap();
        assert_ne!(derive_id(&a, &[0xAA]), derive_id(&b, &[0xAA]));
    }

    #[test]
    fn derived_ids_are_well_formed() {
        let id = derive_id(&sha256(b"x"), b"salt");
        assert!(is_well_formed_id(&id));
        assert!(!is_well_formed_id("nope"));
        assert!(!is_well_formed_id(&id.to_uppercase()));
    }

    #[test]
    fn salt_is_not_the_id() {
        let hash = sha256(b"content");
        let id = derive_id(&hash, &[]);
        assert_ne!(id, hex::encode(hash));
    }
}
