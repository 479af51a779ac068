//! Shipment content and its canonical encoding.
//!
//! [`ShipmentContent`] is the bill-of-lading payload a BF_TX carries. Its
//! canonical form is compact JSON with fields in declaration order and
//! absent optionals omitted, so two field-for-field identical payloads
//! always encode to the same string and any field difference changes it.
//! The canonical string is what gets hashed for ID derivation, indexed for
//! reverse lookup and embedded in the persisted record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BFTX_TYPE;
use crate::crypto::hash::sha256;

/// Errors raised while parsing or encoding shipment content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Input does not fit the BF_TX schema (unknown field, wrong type,
    /// malformed date, invalid JSON).
    #[error("content does not match the BF_TX schema: {0}")]
    Schema(String),

    /// Content could not be encoded.
    #[error("failed to encode content: {0}")]
    Encoding(String),
}

fn default_type() -> String {
    BFTX_TYPE.to_string()
}

/// The structured payload of a shipment transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShipmentContent {
    /// Record type tag. Always `"BF_TX"` for valid content; anything else
    /// fails validation rather than parsing, so the caller sees which rule
    /// was broken.
    #[serde(rename = "type", default = "default_type")]
    pub tx_type: String,

    pub properties: Properties,
}

/// Bill-of-lading properties.
///
/// `shipper` and `carrier` are required by validation; everything else is
/// optional and omitted from the canonical form when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Properties {
    #[serde(default)]
    pub shipper: String,
    #[serde(default)]
    pub carrier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bol_num: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_num: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_bill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_of_loading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_of_discharge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc_of_goods: Option<String>,
    /// Gross weight in kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_weight: Option<u64>,
    /// Freight payable amount in minor currency units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freight_payable_amt: Option<u64>,
    /// Freight advance amount in minor currency units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freight_adv_amt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_shipped: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_details: Option<IssueDetails>,
    /// Number of original bills issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_bol: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_info: Option<MasterInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_for_master: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_for_owner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_issue: Option<NaiveDate>,
}

/// The vessel master who signs the bill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasterInfo {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

impl Properties {
    /// Properties with just the two required parties set.
    pub fn new(shipper: impl Into<String>, carrier: impl Into<String>) -> Self {
        Self {
            shipper: shipper.into(),
            carrier: carrier.into(),
            ..Default::default()
        }
    }
}

impl ShipmentContent {
    pub fn new(properties: Properties) -> Self {
        Self {
            tx_type: default_type(),
            properties,
        }
    }

    /// Parse caller-supplied JSON.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        serde_json::from_str(json).map_err(|e| ContentError::Schema(e.to_string()))
    }

    /// Canonical string form. See [`canonicalize`].
    pub fn canonical(&self) -> Result<String, ContentError> {
        canonicalize(self)
    }

    /// SHA-256 of the canonical form.
    pub fn content_hash(&self) -> Result<[u8; 32], ContentError> {
        Ok(sha256(self.canonical()?.as_bytes()))
    }
}

/// Produce the canonical encoding of `content`.
pub fn canonicalize(content: &ShipmentContent) -> Result<String, ContentError> {
    serde_json::to_string(content).map_err(|e| ContentError::Encoding(e.to_string()))
}
