//! Record signing.
//!
//! The lifecycle talks to a [`Signer`]; it does not care where the key
//! lives. A signer attaches `signature` and `signer_public_key` to the
//! record and nothing else; flipping `verified` is the lifecycle's job once
//! the signer reports success.
//!
//! The signed message is [`Record::signable_bytes`]: the record ID plus the
//! canonical content. Lifecycle flags are excluded so broadcasting or
//! amending a record never invalidates its signature.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::content::ContentError;
use super::record::Record;
use crate::crypto::keys::{BftxKeypair, BftxPublicKey, BftxSignature, KeyError};

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing key unavailable: {0}")]
    Key(#[from] KeyError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("record {0} carries no signature")]
    Unsigned(String),

    #[error("record {0} has no signer public key")]
    MissingPublicKey(String),

    #[error("signature on record {0} does not verify")]
    BadSignature(String),
}

/// Signs records on behalf of the lifecycle.
pub trait Signer {
    fn sign(&self, record: &mut Record) -> Result<(), SigningError>;
}

impl<T: Signer + ?Sized> Signer for &T {
    fn sign(&self, record: &mut Record) -> Result<(), SigningError> {
        (**self).sign(record)
    }
}

fn attach_signature(keypair: &BftxKeypair, record: &mut Record) -> Result<(), SigningError> {
    let message = record.signable_bytes()?;
    let signature = keypair.sign(&message);
    record.signature = Some(signature.to_hex());
    record.signer_public_key = Some(keypair.public_key().to_hex());
    Ok(())
}

/// Signs with an in-memory keypair.
#[derive(Debug, Clone)]
pub struct KeypairSigner {
    keypair: BftxKeypair,
}

impl KeypairSigner {
    pub fn new(keypair: BftxKeypair) -> Self {
        Self { keypair }
    }

    pub fn public_key(&self) -> BftxPublicKey {
        self.keypair.public_key()
    }
}

impl Signer for KeypairSigner {
    fn sign(&self, record: &mut Record) -> Result<(), SigningError> {
        attach_signature(&self.keypair, record)
    }
}

/// Reads the secret key from a file each time it signs.
///
/// Nothing is cached, so the key is only touched by commands that actually
/// sign, and a missing key file surfaces as a [`SigningError::Key`].
#[derive(Debug, Clone)]
pub struct KeyFileSigner {
    path: PathBuf,
}

impl KeyFileSigner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Signer for KeyFileSigner {
    fn sign(&self, record: &mut Record) -> Result<(), SigningError> {
        let keypair = BftxKeypair::load(&self.path)?;
        attach_signature(&keypair, record)
    }
}

/// Check a signed record against its embedded public key.
pub fn verify_record_signature(record: &Record) -> Result<(), SigningError> {
    let signature_hex = record
        .signature
        .as_deref()
        .ok_or_else(|| SigningError::Unsigned(record.id.clone()))?;
    let key_hex = record
        .signer_public_key
        .as_deref()
        .ok_or_else(|| SigningError::MissingPublicKey(record.id.clone()))?;

    let public_key = BftxPublicKey::from_hex(key_hex)?;
    let signature = BftxSignature::from_hex(signature_hex)?;
    if public_key.verify(&record.signable_bytes()?, &signature) {
        Ok(())
    } else {
        Err(SigningError::BadSignature(record.id.clone()))
    }
}
