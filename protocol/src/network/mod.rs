//! # Network Module
//!
//! The consensus network as the lifecycle sees it: a place to read the
//! latest committed app hash, submit a transaction, and look one up by ID.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs  ChainClient trait, ChainInfo, SubmitReceipt, NetworkError
//! rpc.rs  JSON-RPC envelope and the Tendermint HTTP client
//! ```
//!
//! ## Design Decisions
//!
//! - Every call is synchronous and blocking. A CLI invocation performs at
//!   most two round trips.
//! - Nothing retries. A timeout or refused connection surfaces immediately
//!   as a [`NetworkError`] and the caller decides what to do.
//! - A submit that reaches the node but is rejected by the application
//!   (non-zero `code`) is still an error: [`NetworkError::Rejected`].

pub mod rpc;

pub use rpc::{RpcError, RpcMethod, RpcRequest, RpcResponse, TendermintClient};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed rpc response: {0}")]
    Decode(String),

    #[error("transaction rejected by the application (code {code}): {log}")]
    Rejected { code: u32, log: String },
}

/// Snapshot of the chain head from `abci_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Free-form application data reported by the ABCI app.
    pub data: String,
    pub last_block_height: u64,
    /// Latest committed application hash. Empty before the first commit.
    pub last_block_app_hash: Vec<u8>,
}

/// Result of a `broadcast_tx_sync` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Transaction hash as reported by the node (uppercase hex).
    pub hash: String,
    /// ABCI `CheckTx` code. Zero means accepted.
    pub code: u32,
    pub log: String,
    pub data: Vec<u8>,
}

impl SubmitReceipt {
    pub fn is_accepted(&self) -> bool {
        self.code == 0
    }
}

/// Everything the lifecycle needs from the consensus network.
pub trait ChainClient {
    /// Current chain head.
    fn info(&self) -> Result<ChainInfo, NetworkError>;

    /// Salt for ID derivation: the latest committed app hash.
    fn latest_app_hash(&self) -> Result<Vec<u8>, NetworkError> {
        Ok(self.info()?.last_block_app_hash)
    }

    /// Submit raw transaction bytes and wait for `CheckTx`.
    fn submit(&self, tx: &[u8]) -> Result<SubmitReceipt, NetworkError>;

    /// Raw bytes of the committed transaction tagged with `id`, if any.
    fn query_by_id(&self, id: &str) -> Result<Option<Vec<u8>>, NetworkError>;
}

impl<T: ChainClient + ?Sized> ChainClient for &T {
    fn info(&self) -> Result<ChainInfo, NetworkError> {
        (**self).info()
    }

    fn latest_app_hash(&self) -> Result<Vec<u8>, NetworkError> {
        (**self).latest_app_hash()
    }

    fn submit(&self, tx: &[u8]) -> Result<SubmitReceipt, NetworkError> {
        (**self).submit(tx)
    }

    fn query_by_id(&self, id: &str) -> Result<Option<Vec<u8>>, NetworkError> {
        (**self).query_by_id(id)
    }
}
