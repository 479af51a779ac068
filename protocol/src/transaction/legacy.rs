//! Legacy record schema adapter.
//!
//! Databases written by the original Go tooling hold records in a flat
//! PascalCase JSON shape where absence is spelled as `""` or `0`. This
//! module maps that shape to and from [`Record`] with pure functions, and
//! [`decode_record`] lets the storage layer read either schema. Records are
//! always written back in the current schema.
//!
//! Mapping rules: empty strings and zero numbers become `None` and back; an
//! unparsable legacy date is a schema error. Legacy signatures were ECDSA
//! and carry no public key, so they map across but never verify.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::content::{ContentError, IssueDetails, MasterInfo, Properties, ShipmentContent};
use super::record::Record;
use crate::config::RECORD_SCHEMA_VERSION;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyRecord {
    pub id: String,
    #[serde(default)]
    pub r#type: String,
    pub properties: LegacyProperties,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub transmitted: bool,
    #[serde(default)]
    pub amendment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacyProperties {
    pub shipper: String,
    pub carrier: String,
    pub consignee: String,
    pub bol_num: u64,
    pub ref_num: u64,
    pub house_bill: String,
    pub vessel: String,
    pub port_of_loading: String,
    pub port_of_discharge: String,
    pub notify_address: String,
    pub desc_of_goods: String,
    pub gross_weight: u64,
    pub freight_payable_amt: u64,
    pub freight_adv_amt: u64,
    pub general_instructions: String,
    pub date_shipped: String,
    pub issue_details: LegacyIssueDetails,
    pub num_bol: u64,
    pub master_info: LegacyMasterInfo,
    pub agent_for_master: String,
    pub agent_for_owner: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacyIssueDetails {
    pub place_of_issue: String,
    pub date_of_issue: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacyMasterInfo {
    pub first_name: String,
    pub last_name: String,
    pub sig: String,
}

fn opt_string(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn opt_u64(n: u64) -> Option<u64> {
    (n != 0).then_some(n)
}

fn opt_date(s: &str, field: &str) -> Result<Option<NaiveDate>, ContentError> {
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| ContentError::Schema(format!("legacy {field} {s:?}: {e}")))
}

fn date_string(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

impl TryFrom<LegacyRecord> for Record {
    type Error = ContentError;

    fn try_from(legacy: LegacyRecord) -> Result<Self, Self::Error> {
        let p = legacy.properties;

        let issue_details = {
            let place_of_issue = opt_string(&p.issue_details.place_of_issue);
            let date_of_issue = opt_date(&p.issue_details.date_of_issue, "DateOfIssue")?;
            (place_of_issue.is_some() || date_of_issue.is_some()).then_some(IssueDetails {
                place_of_issue,
                date_of_issue,
            })
        };

        let master = p.master_info;
        let master_info = (!master.first_name.is_empty()
            || !master.last_name.is_empty()
            || !master.sig.is_empty())
        .then(|| MasterInfo {
            first_name: master.first_name,
            last_name: master.last_name,
            sig: opt_string(&master.sig),
        });

        let properties = Properties {
            shipper: p.shipper,
            carrier: p.carrier,
            consignee: opt_string(&p.consignee),
            bol_num: opt_u64(p.bol_num),
            ref_num: opt_u64(p.ref_num),
            house_bill: opt_string(&p.house_bill),
            vessel: opt_string(&p.vessel),
            port_of_loading: opt_string(&p.port_of_loading),
            port_of_discharge: opt_string(&p.port_of_discharge),
            notify_address: opt_string(&p.notify_address),
            desc_of_goods: opt_string(&p.desc_of_goods),
            gross_weight: opt_u64(p.gross_weight),
            freight_payable_amt: opt_u64(p.freight_payable_amt),
            freight_adv_amt: opt_u64(p.freight_adv_amt),
            general_instructions: opt_string(&p.general_instructions),
            date_shipped: opt_date(&p.date_shipped, "DateShipped")?,
            issue_details,
            num_bol: opt_u64(p.num_bol),
            master_info,
            agent_for_master: opt_string(&p.agent_for_master),
            agent_for_owner: opt_string(&p.agent_for_owner),
        };

        let mut content = ShipmentContent::new(properties);
        if !legacy.r#type.is_empty() {
            content.tx_type = legacy.r#type;
        }

        Ok(Record {
            schema: RECORD_SCHEMA_VERSION,
            id: legacy.id,
            content,
            verified: legacy.verified,
            transmitted: legacy.transmitted,
            amendment: opt_string(&legacy.amendment),
            signature: opt_string(&legacy.signature),
            signer_public_key: None,
        })
    }
}

impl From<&Record> for LegacyRecord {
    fn from(record: &Record) -> Self {
        let p = &record.content.properties;
        let issue = p.issue_details.clone().unwrap_or_default();
        let master = p.master_info.clone().unwrap_or_default();

        LegacyRecord {
            id: record.id.clone(),
            r#type: record.content.tx_type.clone(),
            properties: LegacyProperties {
                shipper: p.shipper.clone(),
                carrier: p.carrier.clone(),
                consignee: p.consignee.clone().unwrap_or_default(),
                bol_num: p.bol_num.unwrap_or_default(),
                ref_num: p.ref_num.unwrap_or_default(),
                house_bill: p.house_bill.clone().unwrap_or_default(),
                vessel: p.vessel.clone().unwrap_or_default(),
                port_of_loading: p.port_of_loading.clone().unwrap_or_default(),
                port_of_discharge: p.port_of_discharge.clone().unwrap_or_default(),
                notify_address: p.notify_address.clone().unwrap_or_default(),
                desc_of_goods: p.desc_of_goods.clone().unwrap_or_default(),
                gross_weight: p.gross_weight.unwrap_or_default(),
                freight_payable_amt: p.freight_payable_amt.unwrap_or_default(),
                freight_adv_amt: p.freight_adv_amt.unwrap_or_default(),
                general_instructions: p.general_instructions.clone().unwrap_or_default(),
                date_shipped: date_string(p.date_shipped),
                issue_details: LegacyIssueDetails {
                    place_of_issue: issue.place_of_issue.unwrap_or_default(),
                    date_of_issue: date_string(issue.date_of_issue),
                },
                num_bol: p.num_bol.unwrap_or_default(),
                master_info: LegacyMasterInfo {
                    first_name: master.first_name,
                    last_name: master.last_name,
                    sig: master.sig.unwrap_or_default(),
                },
                agent_for_master: p.agent_for_master.clone().unwrap_or_default(),
                agent_for_owner: p.agent_for_owner.clone().unwrap_or_default(),
            },
            signature: record.signature.clone().unwrap_or_default(),
            verified: record.verified,
            transmitted: record.transmitted,
            amendment: record.amendment.clone().unwrap_or_default(),
        }
    }
}

/// Decode a stored value written in either schema.
///
/// The current schema is tried first; legacy decoding only runs when that
/// fails, and the error reported on total failure is the current-schema one.
pub fn decode_record(raw: &[u8]) -> Result<Record, ContentError> {
    match Record::from_canonical(raw) {
        Ok(record) => Ok(record),
        Err(current_err) => match serde_json::from_slice::<LegacyRecord>(raw) {
            Ok(legacy) => {
                tracing::debug!(id = %legacy.id, "decoded record with legacy schema");
                Record::try_from(legacy)
            }
            Err(_) => Err(current_err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GO_RECORD: &str = r#"{
        "Id": "5f1d0c3b",
        "Type": "BF_TX",
        "Properties": {
            "Shipper": "Acme Freight",
            "Carrier": "Oceanic Lines",
            "BolNum": 120034,
            "Consignee": "",
            "GrossWeight": 18250,
            "DateShipped": "2017-09-01",
            "IssueDetails": {"PlaceOfIssue": "Sydney", "DateOfIssue": "2017-09-02"},
            "MasterInfo": {"FirstName": "", "LastName": "", "Sig": ""}
        },
        "PrivateKey": {"Curve": {}, "X": 1, "Y": 2, "D": 3},
        "Signhash": [1, 2, 3],
        "Signature": "3045022100ab",
        "Verified": true,
        "Transmitted": false,
        "Amendment": ""
    }"#;

    #[test]
    fn go_record_maps_to_current_schema() {
        let record = decode_record(GO_RECORD.as_bytes()).unwrap();
        assert_eq!(record.id, "5f1d0c3b");
        assert_eq!(record.content.properties.shipper, "Acme Freight");
        assert_eq!(record.content.properties.consignee, None);
        assert_eq!(record.content.properties.bol_num, Some(120_034));
        assert_eq!(
            record.content.properties.date_shipped,
            NaiveDate::from_ymd_opt(2017, 9, 1)
        );
        assert!(record.content.properties.master_info.is_none());
        assert!(record.verified);
        assert!(!record.transmitted);
        assert!(record.amendment.is_none());
        assert_eq!(record.signature.as_deref(), Some("3045022100ab"));
        assert!(record.signer_public_key.is_none());
    }

    #[test]
    fn legacy_roundtrip_is_lossless() {
        let legacy: LegacyRecord = serde_json::from_str(GO_RECORD).unwrap();
        let record = Record::try_from(legacy.clone()).unwrap();
        assert_eq!(LegacyRecord::from(&record), legacy);
    }

    #[test]
    fn current_roundtrip_is_lossless() {
        let mut record = Record::draft(
            "ab".repeat(32),
            ShipmentContent::new(Properties {
                vessel: Some("MV Southern Cross".into()),
                num_bol: Some(3),
                master_info: Some(MasterInfo {
                    first_name: "Ada".into(),
                    last_name: String::new(),
                    sig: Some("AL".into()),
                }),
                issue_details: Some(IssueDetails {
                    place_of_issue: None,
                    date_of_issue: NaiveDate::from_ymd_opt(2018, 1, 31),
                }),
                ..Properties::new("A", "B")
            }),
        );
        record.verified = true;
        record.amendment = Some("cd".repeat(32));

        let back = Record::try_from(LegacyRecord::from(&record)).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn current_schema_is_preferred() {
        let record = Record::draft("ab".repeat(32), ShipmentContent::new(Properties::new("A", "B")));
        let raw = record.canonical().unwrap();
        assert_eq!(decode_record(raw.as_bytes()).unwrap(), record);
    }

    #[test]
    fn bad_legacy_date_is_a_schema_error() {
        let raw = GO_RECORD.replace("2017-09-01", "09/01/2017");
        assert!(matches!(
            decode_record(raw.as_bytes()),
            Err(ContentError::Schema(_))
        ));
    }

    #[test]
    fn garbage_reports_current_schema_error() {
        assert!(matches!(
            decode_record(b"not json"),
            Err(ContentError::Schema(_))
        ));
    }
}
