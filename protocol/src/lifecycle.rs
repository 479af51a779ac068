//! # Transaction Lifecycle
//!
//! The `Lifecycle` ties the record store, the chain client and a signer into
//! the BF_TX state machine. It is the component that turns "some shipment
//! JSON" into "a signed record committed on chain", one guarded transition
//! at a time.
//!
//! ## Transitions
//!
//! ```text
//! construct ──► Draft ──sign──► Signed ──broadcast──► Transmitted
//!                 │               │                      │
//!                 └────────── append (sets amendment) ───┘
//! ```
//!
//! `verified` and `transmitted` are ratchets: once set they are never
//! cleared. `amendment` is orthogonal to the ladder and is set at most once.
//!
//! ## Consistency
//!
//! Nothing is cached between calls. Every transition re-reads the record,
//! checks its guard against that value, and writes the successor with
//! [`RecordStore::replace`], which fails with a conflict if another writer
//! got there first. A failed guard never writes.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::network::{ChainClient, ChainInfo, NetworkError, SubmitReceipt};
use crate::storage::{RecordStore, StoreError};
use crate::transaction::legacy::decode_record;
use crate::transaction::{
    generate_id, validate_content, validate_record, ContentError, IdentityError, Record,
    RecordState, ShipmentContent, Signer, SigningError, ValidationError,
};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid content: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("record {0} not found")]
    NotFound(String),

    #[error("no stored record matches the given content")]
    ContentNotFound,

    #[error("record {0} is not committed on chain")]
    NotOnChain(String),

    #[error("record {0} is already signed")]
    AlreadySigned(String),

    #[error("record {0} must be signed before it can be broadcast")]
    NotSigned(String),

    #[error("record {0} has already been transmitted")]
    AlreadyTransmitted(String),

    #[error("record {id} is already amended by {amendment}")]
    AlreadyAmended { id: String, amendment: String },

    #[error("chain unavailable: {0}")]
    ChainUnavailable(#[source] NetworkError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),
}

impl From<IdentityError> for LifecycleError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Content(e) => LifecycleError::Content(e),
            IdentityError::ChainUnavailable(e) => LifecycleError::ChainUnavailable(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// The BF_TX state machine over an injected store, chain client and signer.
#[derive(Debug)]
pub struct Lifecycle<S, C, G> {
    store: S,
    chain: C,
    signer: G,
}

impl<S, C, G> Lifecycle<S, C, G>
where
    S: RecordStore,
    C: ChainClient,
    G: Signer,
{
    pub fn new(store: S, chain: C, signer: G) -> Self {
        Self {
            store,
            chain,
            signer,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn signer(&self) -> &G {
        &self.signer
    }

    /// Validate `content`, derive its ID against the current chain head and
    /// store it as a Draft. Returns the new ID.
    pub fn construct(&self, content: ShipmentContent) -> Result<String, LifecycleError> {
        let record = self.draft(content)?;
        self.store.insert(&record)?;
        info!(id = %record.id, "constructed draft record");
        Ok(record.id)
    }

    /// Sign a Draft record and mark it verified.
    pub fn sign(&self, id: &str) -> Result<(), LifecycleError> {
        let current = self.load(id)?;
        if current.verified {
            warn!(id, "sign refused: record already signed");
            return Err(LifecycleError::AlreadySigned(id.to_string()));
        }

        let mut next = current.clone();
        self.signer.sign(&mut next)?;
        next.verified = true;
        self.store.replace(&current, &next)?;
        info!(id, "record signed");
        Ok(())
    }

    /// Submit a signed record to the chain and mark it transmitted.
    ///
    /// The bytes submitted are the canonical form of the record as it will
    /// be persisted, `transmitted` flag included. The record is only marked
    /// transmitted once the node accepts it, so a failed or rejected submit
    /// can be retried.
    pub fn broadcast(&self, id: &str) -> Result<SubmitReceipt, LifecycleError> {
        let current = self.load(id)?;
        if !current.verified {
            warn!(id, "broadcast refused: record not signed");
            return Err(LifecycleError::NotSigned(id.to_string()));
        }
        if current.transmitted {
            warn!(id, "broadcast refused: record already transmitted");
            return Err(LifecycleError::AlreadyTransmitted(id.to_string()));
        }

        let mut next = current.clone();
        next.transmitted = true;
        let tx = next.canonical()?;

        let receipt = self.chain.submit(tx.as_bytes())?;
        if !receipt.is_accepted() {
            warn!(id, code = receipt.code, log = %receipt.log, "broadcast rejected");
            return Err(NetworkError::Rejected {
                code: receipt.code,
                log: receipt.log,
            }
            .into());
        }

        if let Err(e) = self.store.replace(&current, &next) {
            warn!(id, hash = %receipt.hash, error = %e, "accepted by the node but not marked transmitted");
            return Err(e.into());
        }
        info!(id, hash = %receipt.hash, "record transmitted");
        Ok(receipt)
    }

    /// Construct a record from `content` and link `target_id` forward to it.
    /// Returns the new record's ID.
    ///
    /// A record can be amended once. The new record and the link are written
    /// in one atomic store write, so a refused append leaves no new record
    /// behind, including when another writer amends the target first.
    pub fn append(
        &self,
        content: ShipmentContent,
        target_id: &str,
    ) -> Result<String, LifecycleError> {
        let target = self.load(target_id)?;
        Self::ensure_unamended(&target)?;

        let record = self.draft(content)?;
        let mut linked = target.clone();
        linked.amendment = Some(record.id.clone());

        match self.store.insert_amendment(&record, &target, &linked) {
            Ok(()) => {}
            Err(StoreError::Conflict(conflict)) if conflict == target.id => {
                // Lost the race for the target: report who won.
                Self::ensure_unamended(&self.load(target_id)?)?;
                return Err(StoreError::Conflict(conflict).into());
            }
            Err(e) => return Err(e.into()),
        }
        info!(id = target_id, amendment = %record.id, "record amended");
        Ok(record.id)
    }

    /// Lifecycle flags of a stored record.
    pub fn state(&self, id: &str) -> Result<RecordState, LifecycleError> {
        Ok(self.load(id)?.state())
    }

    pub fn get(&self, id: &str) -> Result<Record, LifecycleError> {
        self.load(id)
    }

    pub fn total(&self) -> Result<usize, LifecycleError> {
        Ok(self.store.count()?)
    }

    /// ID of the stored record whose content equals `content`.
    pub fn verify(&self, content: &ShipmentContent) -> Result<String, LifecycleError> {
        let id = self
            .store
            .find_by_content(content)?
            .ok_or(LifecycleError::ContentNotFound)?;
        debug!(id = %id, "content matched stored record");
        Ok(id)
    }

    /// Structural validation only. Touches neither store nor chain.
    pub fn validate(&self, content: &ShipmentContent) -> Result<(), LifecycleError> {
        validate_content(content)?;
        Ok(())
    }

    /// The record committed on chain under `id`.
    pub fn query(&self, id: &str) -> Result<Record, LifecycleError> {
        let tx = self
            .chain
            .query_by_id(id)?
            .ok_or_else(|| LifecycleError::NotOnChain(id.to_string()))?;
        Ok(decode_record(&tx)?)
    }

    pub fn chain_info(&self) -> Result<ChainInfo, LifecycleError> {
        self.chain.info().map_err(LifecycleError::ChainUnavailable)
    }

    /// Validated Draft for `content`, with its ID derived against the
    /// current chain head. Not stored.
    fn draft(&self, content: ShipmentContent) -> Result<Record, LifecycleError> {
        validate_content(&content)?;
        let id = generate_id(&content, &self.chain)?;
        let record = Record::draft(id, content);
        validate_record(&record)?;
        Ok(record)
    }

    fn ensure_unamended(target: &Record) -> Result<(), LifecycleError> {
        match &target.amendment {
            Some(existing) => {
                warn!(id = %target.id, amendment = %existing, "append refused: target already amended");
                Err(LifecycleError::AlreadyAmended {
                    id: target.id.clone(),
                    amendment: existing.clone(),
                })
            }
            None => Ok(()),
        }
    }

    fn load(&self, id: &str) -> Result<Record, LifecycleError> {
        let record = self
            .store
            .get(id)?
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;
        debug!(id, state = %record.state(), "record loaded");
        Ok(record)
    }
}
