//! # Protocol Configuration & Constants
//!
//! Every fixed value the BF_TX engine depends on lives here. The CLI exposes
//! the tunable ones (RPC URL, data directory, timeouts) as flags with
//! environment fallbacks; everything else is part of the record format and
//! changing it breaks compatibility with records already on chain.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Record Format
// ---------------------------------------------------------------------------

/// Type tag carried by every shipment transaction.
pub const BFTX_TYPE: &str = "BF_TX";

/// Record schema version written by this crate. Legacy records (written by
/// the original Go tooling) carry no version field and are decoded through
/// [`crate::transaction::legacy`].
pub const RECORD_SCHEMA_VERSION: u16 = 2;

/// BLAKE3 derive-key context for transaction ID derivation. Mixing a
/// context string into the hash keeps IDs from colliding with any other
/// BLAKE3 digest computed over the same bytes.
pub const ID_DERIVATION_CONTEXT: &str = "blockfreight 2017-09-01 bftx transaction id";

/// Length of a transaction ID in hex characters (32-byte digest).
pub const ID_HEX_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Signature scheme used by the default signing adapter.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ed25519 secret key length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Ed25519 public key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Default Tendermint RPC endpoint of a local node.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:46657";

/// Per-request timeout for RPC calls. The engine never retries; a call that
/// exceeds this fails with a network error and the caller decides.
pub const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Event tag key the ABCI application indexes transactions under.
pub const TX_INDEX_TAG: &str = "bftx.id";

/// Builds the `tx_search` query that finds a transaction by its BF_TX ID.
pub fn tx_search_query(id: &str) -> String {
    format!("{}='{}'", TX_INDEX_TAG, id)
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Default directory for the local record database.
pub const DEFAULT_DATA_DIR: &str = ".bftx";

/// Sub-directory of the data directory holding the sled database.
pub const DB_DIR_NAME: &str = "db";

/// File name of the signing key inside the data directory.
pub const KEY_FILE_NAME: &str = "signer.key";
