//! # Transaction Module
//!
//! The BF_TX record and everything that can be computed about it without
//! touching the store or the chain.
//!
//! ```text
//! content.rs    ShipmentContent, Properties, canonical encoding
//! identity.rs   chain-salted transaction ID derivation
//! record.rs     persisted Record, lifecycle flags, RecordState
//! validation.rs structural rules for content and new records
//! signing.rs    Signer trait, keypair and key-file signers
//! legacy.rs     adapter for records written in the legacy schema
//! ```
//!
//! ## Record Lifecycle
//!
//! 1. **Construct**: content is validated, an ID is derived from its hash
//!    and the chain salt, and a Draft record is stored.
//! 2. **Sign**: a [`Signer`] signs the ID and content; `verified` is set.
//! 3. **Broadcast**: the canonical record is submitted to the chain;
//!    `transmitted` is set.
//! 4. **Amend**: at any point, a new record can be appended to an
//!    existing one, which then points forward to it.

pub mod content;
pub mod identity;
pub mod legacy;
pub mod record;
pub mod signing;
pub mod validation;

pub use content::{
    canonicalize, ContentError, IssueDetails, MasterInfo, Properties, ShipmentContent,
};
pub use identity::{derive_id, generate_id, IdentityError};
pub use record::{LifecycleState, Record, RecordState};
pub use signing::{verify_record_signature, KeyFileSigner, KeypairSigner, Signer, SigningError};
pub use validation::{validate_content, validate_record, ValidationError};
