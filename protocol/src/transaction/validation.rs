//! Structural validation of shipment content and records.
//!
//! Checks are cheap and local: no store or network access. The lifecycle
//! runs [`validate_content`] before deriving an ID and [`validate_record`]
//! once the ID is assigned, right before the first write.

use chrono::NaiveDate;
use thiserror::Error;

use super::content::ShipmentContent;
use super::identity::is_well_formed_id;
use super::record::Record;
use crate::config::BFTX_TYPE;

/// A broken validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("type must be {expected:?}, got {found:?}")]
    WrongType {
        expected: &'static str,
        found: String,
    },

    #[error("required property {0} is missing or blank")]
    MissingProperty(&'static str),

    #[error("bill issued on {issued} before the goods shipped on {shipped}")]
    IssuedBeforeShipped { shipped: NaiveDate, issued: NaiveDate },

    #[error("num_bol must be at least 1")]
    ZeroBillCount,

    #[error("malformed transaction id {0:?}")]
    MalformedId(String),

    #[error("new record {0} already carries lifecycle state")]
    NotDraft(String),
}

/// Validate shipment content against the BF_TX rules.
///
/// Rules, in order:
/// 1. `type` is `"BF_TX"`.
/// 2. `shipper` and `carrier` are non-blank.
/// 3. `num_bol`, when present, is at least 1.
/// 4. The issue date, when present, is not before the shipping date.
pub fn validate_content(content: &ShipmentContent) -> Result<(), ValidationError> {
    if content.tx_type != BFTX_TYPE {
        return Err(ValidationError::WrongType {
            expected: BFTX_TYPE,
            found: content.tx_type.clone(),
        });
    }

    let props = &content.properties;
    if props.shipper.trim().is_empty() {
        return Err(ValidationError::MissingProperty("shipper"));
    }
    if props.carrier.trim().is_empty() {
        return Err(ValidationError::MissingProperty("carrier"));
    }

    if props.num_bol == Some(0) {
        return Err(ValidationError::ZeroBillCount);
    }

    let issued = props
        .issue_details
        .as_ref()
        .and_then(|details| details.date_of_issue);
    if let (Some(shipped), Some(issued)) = (props.date_shipped, issued) {
        if issued < shipped {
            return Err(ValidationError::IssuedBeforeShipped { shipped, issued });
        }
    }

    Ok(())
}

/// Validate a freshly constructed record before it is first persisted.
pub fn validate_record(record: &Record) -> Result<(), ValidationError> {
    if !is_well_formed_id(&record.id) {
        return Err(ValidationError::MalformedId(record.id.clone()));
    }
    if record.verified
        || record.transmitted
        || record.amendment.is_some()
        || record.signature.is_some()
    {
        return Err(ValidationError::NotDraft(record.id.clone()));
    }
    validate_content(&record.content)
}
