//! The persisted BF_TX record and its lifecycle view.
//!
//! Lifecycle flags live inside the record itself: the store holds one
//! canonical JSON value per ID and nothing else, so a record read back from
//! disk carries its complete state.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::content::{ContentError, ShipmentContent};
use crate::config::RECORD_SCHEMA_VERSION;

/// A shipment transaction as stored locally and submitted to the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    /// Record schema version, see [`RECORD_SCHEMA_VERSION`].
    pub schema: u16,

    /// Chain-anchored transaction ID, assigned once at construction.
    pub id: String,

    /// Shipment payload. Never changes after construction.
    pub content: ShipmentContent,

    /// Set once the record has been signed. Never reset.
    pub verified: bool,

    /// Set once the record has been accepted by the network. Never reset.
    pub transmitted: bool,

    /// ID of the record that amends this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment: Option<String>,

    /// Hex-encoded signature over [`Record::signable_bytes`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Hex-encoded public key of the signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_public_key: Option<String>,
}

/// Position of a record on the Draft → Signed → Transmitted ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Draft,
    Signed,
    Transmitted,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "Draft"),
            Self::Signed => write!(f, "Signed"),
            Self::Transmitted => write!(f, "Transmitted"),
        }
    }
}

/// Snapshot of a record's flags, returned by `state` queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordState {
    pub verified: bool,
    pub transmitted: bool,
    pub amendment: Option<String>,
}

impl RecordState {
    pub fn lifecycle(&self) -> LifecycleState {
        if self.transmitted {
            LifecycleState::Transmitted
        } else if self.verified {
            LifecycleState::Signed
        } else {
            LifecycleState::Draft
        }
    }

    pub fn is_amended(&self) -> bool {
        self.amendment.is_some()
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (verified: {}, transmitted: {}",
            self.lifecycle(),
            self.verified,
            self.transmitted
        )?;
        match &self.amendment {
            Some(id) => write!(f, ", amended by {})", id),
            None => write!(f, ", not amended)"),
        }
    }
}

impl Record {
    /// A fresh, unsigned record.
    pub fn draft(id: impl Into<String>, content: ShipmentContent) -> Self {
        Self {
            schema: RECORD_SCHEMA_VERSION,
            id: id.into(),
            content,
            verified: false,
            transmitted: false,
            amendment: None,
            signature: None,
            signer_public_key: None,
        }
    }

    /// Canonical JSON of the whole record, as persisted and broadcast.
    pub fn canonical(&self) -> Result<String, ContentError> {
        serde_json::to_string(self).map_err(|e| ContentError::Encoding(e.to_string()))
    }

    /// Parse a record in the current schema.
    pub fn from_canonical(raw: &[u8]) -> Result<Self, ContentError> {
        serde_json::from_slice(raw).map_err(|e| ContentError::Schema(e.to_string()))
    }

    /// Bytes covered by the record signature: the ID, a NUL separator and
    /// the canonical content. Flags and the amendment link are excluded, so
    /// later transitions do not invalidate the signature.
    pub fn signable_bytes(&self) -> Result<Vec<u8>, ContentError> {
        let content = self.content.canonical()?;
        let mut buf = Vec::with_capacity(self.id.len() + 1 + content.len());
        buf.extend_from_slice(self.id.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(content.as_bytes());
        Ok(buf)
    }

    pub fn state(&self) -> RecordState {
        RecordState {
            verified: self.verified,
            transmitted: self.transmitted,
            amendment: self.amendment.clone(),
        }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.state().lifecycle()
    }

    /// Indented JSON for human display.
    pub fn pretty(&self) -> Result<String, ContentError> {
        serde_json::to_string_pretty(self).map_err(|e| ContentError::Encoding(e.to_string()))
    }
}
