//! # Storage Module
//!
//! Durable record storage. The lifecycle only sees the [`RecordStore`]
//! trait; [`BftxDb`] implements it over sled.
//!
//! ## Layout
//!
//! ```text
//! records        id (UTF-8)               → canonical record JSON
//! content_index  SHA-256(content) (32B)   → id (UTF-8)
//! ```
//!
//! ## Write discipline
//!
//! Records are append-only: an ID is inserted once and never removed.
//! Transitions go through [`RecordStore::replace`], a compare-and-swap
//! against the value the caller read, so two processes sharing one
//! database cannot both win the same transition.

pub mod db;

pub use db::BftxDb;

use thiserror::Error;

use crate::transaction::{Record, ShipmentContent};

/// Errors raised by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The key already exists (insert) or changed since it was read
    /// (replace).
    #[error("write conflict on record {0}: stored value changed")]
    Conflict(String),

    #[error("record {0} is not in the store")]
    Missing(String),

    #[error("record {0}: content is immutable")]
    ImmutableContent(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable, per-key-atomic record storage keyed by transaction ID.
pub trait RecordStore {
    /// Fetch a record by ID.
    fn get(&self, id: &str) -> StoreResult<Option<Record>>;

    /// Store a new record. Fails with [`StoreError::Conflict`] if the ID is
    /// already taken.
    fn insert(&self, record: &Record) -> StoreResult<()>;

    /// Replace `expected` with `next` if the stored value still equals
    /// `expected`. Both must share an ID and content.
    fn replace(&self, expected: &Record, next: &Record) -> StoreResult<()>;

    /// Store a new `record` and, in the same atomic write, replace `target`
    /// with `linked`. Nothing is written if the ID is taken or `target`
    /// changed since it was read; both fail with [`StoreError::Conflict`]
    /// naming the offending ID.
    fn insert_amendment(&self, record: &Record, target: &Record, linked: &Record)
        -> StoreResult<()>;

    /// Number of stored records.
    fn count(&self) -> StoreResult<usize>;

    /// ID of a stored record whose content equals `content`, if any.
    fn find_by_content(&self, content: &ShipmentContent) -> StoreResult<Option<String>>;
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn get(&self, id: &str) -> StoreResult<Option<Record>> {
        (**self).get(id)
    }

    fn insert(&self, record: &Record) -> StoreResult<()> {
        (**self).insert(record)
    }

    fn replace(&self, expected: &Record, next: &Record) -> StoreResult<()> {
        (**self).replace(expected, next)
    }

    fn insert_amendment(
        &self,
        record: &Record,
        target: &Record,
        linked: &Record,
    ) -> StoreResult<()> {
        (**self).insert_amendment(record, target, linked)
    }

    fn count(&self) -> StoreResult<usize> {
        (**self).count()
    }

    fn find_by_content(&self, content: &ShipmentContent) -> StoreResult<Option<String>> {
        (**self).find_by_content(content)
    }
}
