//! # BftxDb: sled-backed record store
//!
//! Two trees:
//!
//! | Tree            | Key                      | Value                 |
//! |-----------------|--------------------------|-----------------------|
//! | `records`       | transaction ID (UTF-8)   | canonical record JSON |
//! | `content_index` | SHA-256 of content (32B) | transaction ID        |
//!
//! A new record and its index entry are written in one sled transaction.
//! The index keeps the first ID stored for a given content; later records
//! with the same content do not displace it. Transitions are a
//! compare-and-swap on the `records` entry alone: content never changes
//! after construction, so the index never needs updating. An amendment
//! writes the new record, its index entry and the target's link together.
//!
//! Values written by the legacy tooling are still readable; see
//! [`crate::transaction::legacy`].

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, IVec, Transactional, Tree};
use std::path::Path;
use tracing::warn;

use super::{RecordStore, StoreError, StoreResult};
use crate::transaction::legacy::decode_record;
use crate::transaction::{ContentError, Record, ShipmentContent};

impl From<ContentError> for StoreError {
    fn from(err: ContentError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Persistent record store over sled.
///
/// sled handles are cheap to clone and safe to share across threads; all
/// clones see the same data.
/// Why a multi-tree write was abandoned.
#[derive(Debug)]
enum WriteAbort {
    /// The new record's ID is already taken.
    IdTaken,
    /// The amendment target no longer holds the value the caller read.
    TargetChanged,
}

#[derive(Debug, Clone)]
pub struct BftxDb {
    db: Db,
    records: Tree,
    content_index: Tree,
}

impl BftxDb {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory database removed on drop. Used by tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let records = db.open_tree("records")?;
        let content_index = db.open_tree("content_index")?;
        Ok(Self {
            db,
            records,
            content_index,
        })
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn decode(raw: &IVec) -> StoreResult<Record> {
        Ok(decode_record(raw)?)
    }

    fn scan_for_content(&self, content: &ShipmentContent) -> StoreResult<Option<String>> {
        for entry in self.records.iter() {
            let (key, value) = entry?;
            let record = match Self::decode(&value) {
                Ok(record) => record,
                Err(e) => {
                    warn!(key = %String::from_utf8_lossy(&key), error = %e, "skipping undecodable record");
                    continue;
                }
            };
            if record.content == *content {
                return Ok(Some(record.id));
            }
        }
        Ok(None)
    }

    /// Stored bytes of `expected.id`, provided they still decode to
    /// `expected`.
    fn current_value(&self, expected: &Record) -> StoreResult<IVec> {
        let current = self
            .records
            .get(expected.id.as_bytes())?
            .ok_or_else(|| StoreError::Missing(expected.id.clone()))?;
        if Self::decode(&current)? != *expected {
            return Err(StoreError::Conflict(expected.id.clone()));
        }
        Ok(current)
    }
}

impl RecordStore for BftxDb {
    fn get(&self, id: &str) -> StoreResult<Option<Record>> {
        match self.records.get(id.as_bytes())? {
            Some(raw) => Ok(Some(Self::decode(&raw)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, record: &Record) -> StoreResult<()> {
        let key = record.id.as_bytes();
        let value = record.canonical()?;
        let content_key = record.content.content_hash()?;

        let outcome = (&self.records, &self.content_index).transaction(|(records, index)| {
            if records.get(key)?.is_some() {
                return Err(ConflictableTransactionError::Abort(()));
            }
            records.insert(key, value.as_bytes())?;
            if index.get(&content_key[..])?.is_none() {
                index.insert(&content_key[..], key)?;
            }
            Ok(())
        });

        match outcome {
            Ok(()) => {}
            Err(TransactionError::Abort(())) => return Err(StoreError::Conflict(record.id.clone())),
            Err(TransactionError::Storage(e)) => return Err(StoreError::Sled(e)),
        }

        self.db.flush()?;
        Ok(())
    }

    fn replace(&self, expected: &Record, next: &Record) -> StoreResult<()> {
        if expected.id != next.id {
            return Err(StoreError::Conflict(next.id.clone()));
        }
        if expected.content != next.content {
            return Err(StoreError::ImmutableContent(next.id.clone()));
        }

        let key = next.id.as_bytes();
        let current = self.current_value(expected)?;

        let value = next.canonical()?;
        if self
            .records
            .compare_and_swap(key, Some(current), Some(value.as_bytes()))?
            .is_err()
        {
            return Err(StoreError::Conflict(next.id.clone()));
        }

        self.db.flush()?;
        Ok(())
    }

    fn insert_amendment(
        &self,
        record: &Record,
        target: &Record,
        linked: &Record,
    ) -> StoreResult<()> {
        if target.id != linked.id {
            return Err(StoreError::Conflict(linked.id.clone()));
        }
        if target.content != linked.content {
            return Err(StoreError::ImmutableContent(linked.id.clone()));
        }

        let key = record.id.as_bytes();
        let value = record.canonical()?;
        let content_key = record.content.content_hash()?;
        let target_key = linked.id.as_bytes();
        let target_current = self.current_value(target)?;
        let target_value = linked.canonical()?;

        let outcome = (&self.records, &self.content_index).transaction(|(records, index)| {
            if records.get(target_key)?.as_ref() != Some(&target_current) {
                return Err(ConflictableTransactionError::Abort(WriteAbort::TargetChanged));
            }
            if records.get(key)?.is_some() {
                return Err(ConflictableTransactionError::Abort(WriteAbort::IdTaken));
            }
            records.insert(key, value.as_bytes())?;
            if index.get(&content_key[..])?.is_none() {
                index.insert(&content_key[..], key)?;
            }
            records.insert(target_key, target_value.as_bytes())?;
            Ok(())
        });

        match outcome {
            Ok(()) => {}
            Err(TransactionError::Abort(WriteAbort::IdTaken)) => {
                return Err(StoreError::Conflict(record.id.clone()))
            }
            Err(TransactionError::Abort(WriteAbort::TargetChanged)) => {
                return Err(StoreError::Conflict(linked.id.clone()))
            }
            Err(TransactionError::Storage(e)) => return Err(StoreError::Sled(e)),
        }

        self.db.flush()?;
        Ok(())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.records.len())
    }

    fn find_by_content(&self, content: &ShipmentContent) -> StoreResult<Option<String>> {
        let content_key = content.content_hash()?;
        if let Some(id) = self.content_index.get(content_key)? {
            let id = String::from_utf8(id.to_vec())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            return Ok(Some(id));
        }
        // Records written by the legacy tooling have no index entry.
        self.scan_for_content(content)
    }
}
