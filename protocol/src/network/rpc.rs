//! # Tendermint JSON-RPC Client
//!
//! JSON-RPC 2.0 over HTTP POST against a Tendermint node. Only three
//! methods are used:
//!
//! | Method              | Used for                                  |
//! |---------------------|-------------------------------------------|
//! | `abci_info`         | chain head and the ID derivation salt     |
//! | `broadcast_tx_sync` | submitting a record, waits for `CheckTx`  |
//! | `tx_search`         | finding a committed record by its BF_TX ID |
//!
//! The wire types below mirror the node's JSON. Tendermint encodes 64-bit
//! integers as strings and binary fields as base64; the conversion into
//! [`ChainInfo`] / [`SubmitReceipt`] happens in pure functions so it can be
//! tested against captured responses without a node.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{ChainClient, ChainInfo, NetworkError, SubmitReceipt};
use crate::config::tx_search_query;

// ---------------------------------------------------------------------------
// RPC Method Enumeration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    /// Parameters: none.
    #[serde(rename = "abci_info")]
    AbciInfo,
    /// Parameters: `{ "tx": base64 }`.
    #[serde(rename = "broadcast_tx_sync")]
    BroadcastTxSync,
    /// Parameters: `{ "query", "prove", "page", "per_page" }`.
    #[serde(rename = "tx_search")]
    TxSearch,
}

// ---------------------------------------------------------------------------
// RPC Request / Response
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version. Always "2.0".
    pub jsonrpc: String,
    /// Request identifier. Echoed back in the response.
    pub id: serde_json::Value,
    pub method: RpcMethod,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: serde_json::Value, method: RpcMethod, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` or `error` is set by a
/// conforming node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Unwrap the envelope into a typed result.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, NetworkError> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        let result = self
            .result
            .ok_or_else(|| NetworkError::Decode("response has neither result nor error".into()))?;
        serde_json::from_value(result).map_err(|e| NetworkError::Decode(e.to_string()))
    }
}

/// JSON-RPC 2.0 error object. Tendermint puts the detail in `data` as a
/// plain string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<RpcError> for NetworkError {
    fn from(err: RpcError) -> Self {
        let message = match err.data {
            Some(serde_json::Value::String(detail)) if !detail.is_empty() => {
                format!("{}: {}", err.message, detail)
            }
            Some(serde_json::Value::Null) | None => err.message,
            Some(other) => format!("{}: {}", err.message, other),
        };
        NetworkError::Rpc {
            code: err.code,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed Result Payloads
// ---------------------------------------------------------------------------

/// Accepts a 64-bit integer as either a JSON number or a decimal string.
fn u64_from_str_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Str(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Int(n) => Ok(n),
        Repr::Str(s) if s.is_empty() => Ok(0),
        Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>, NetworkError> {
    STANDARD
        .decode(value)
        .map_err(|e| NetworkError::Decode(format!("{field}: {e}")))
}

/// `abci_info` result.
#[derive(Debug, Clone, Deserialize)]
pub struct AbciInfoResult {
    pub response: AbciInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AbciInfo {
    pub data: String,
    pub version: String,
    #[serde(deserialize_with = "u64_from_str_or_int")]
    pub last_block_height: u64,
    /// Base64. Absent before the first commit.
    pub last_block_app_hash: String,
}

impl AbciInfoResult {
    pub fn into_chain_info(self) -> Result<ChainInfo, NetworkError> {
        let info = self.response;
        Ok(ChainInfo {
            last_block_app_hash: decode_base64("last_block_app_hash", &info.last_block_app_hash)?,
            data: info.data,
            last_block_height: info.last_block_height,
        })
    }
}

/// `broadcast_tx_sync` result.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastTxResult {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub log: String,
    pub hash: String,
}

impl BroadcastTxResult {
    pub fn into_receipt(self) -> Result<SubmitReceipt, NetworkError> {
        Ok(SubmitReceipt {
            data: decode_base64("data", &self.data)?,
            hash: self.hash,
            code: self.code,
            log: self.log,
        })
    }
}

/// `tx_search` result.
#[derive(Debug, Clone, Deserialize)]
pub struct TxSearchResult {
    #[serde(default)]
    pub txs: Vec<TxSearchEntry>,
    #[serde(deserialize_with = "u64_from_str_or_int")]
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxSearchEntry {
    pub hash: String,
    #[serde(deserialize_with = "u64_from_str_or_int")]
    pub height: u64,
    /// Base64 transaction bytes.
    pub tx: String,
}

impl TxSearchResult {
    /// Bytes of the earliest matching transaction. IDs are unique, so more
    /// than one hit means the same record was broadcast twice; the first
    /// commit wins.
    pub fn into_first_tx(self) -> Result<Option<Vec<u8>>, NetworkError> {
        match self.txs.into_iter().min_by_key(|entry| entry.height) {
            Some(entry) => Ok(Some(decode_base64("tx", &entry.tx)?)),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP Client
// ---------------------------------------------------------------------------

/// Blocking JSON-RPC client for a Tendermint node.
#[derive(Debug)]
pub struct TendermintClient {
    url: String,
    http: reqwest::blocking::Client,
    next_id: AtomicU64,
}

impl TendermintClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: RpcMethod,
        params: serde_json::Value,
    ) -> Result<T, NetworkError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(serde_json::json!(id), method, params);
        tracing::debug!(url = %self.url, ?method, id, "rpc call");

        // Tendermint reports RPC errors with non-2xx statuses but a valid
        // JSON-RPC body, so the status code is not checked here.
        let response: RpcResponse = self.http.post(&self.url).json(&request).send()?.json()?;
        response.into_result()
    }
}

impl ChainClient for TendermintClient {
    fn info(&self) -> Result<ChainInfo, NetworkError> {
        self.call::<AbciInfoResult>(RpcMethod::AbciInfo, serde_json::json!({}))?
            .into_chain_info()
    }

    fn submit(&self, tx: &[u8]) -> Result<SubmitReceipt, NetworkError> {
        let params = serde_json::json!({ "tx": STANDARD.encode(tx) });
        let receipt = self
            .call::<BroadcastTxResult>(RpcMethod::BroadcastTxSync, params)?
            .into_receipt()?;
        tracing::debug!(hash = %receipt.hash, code = receipt.code, "broadcast_tx_sync returned");
        Ok(receipt)
    }

    fn query_by_id(&self, id: &str) -> Result<Option<Vec<u8>>, NetworkError> {
        let params = serde_json::json!({
            "query": tx_search_query(id),
            "prove": false,
            "page": "1",
            "per_page": "30",
        });
        self.call::<TxSearchResult>(RpcMethod::TxSearch, params)?
            .into_first_tx()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> RpcResponse {
        serde_json::from_str(raw).expect("valid response envelope")
    }

    #[test]
    fn request_uses_tendermint_method_names() {
        let req = RpcRequest::new(serde_json::json!(7), RpcMethod::BroadcastTxSync, serde_json::json!({}));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""method":"broadcast_tx_sync""#));
        assert!(json.contains(r#""jsonrpc":"2.0""#));

        for (method, name) in [
            (RpcMethod::AbciInfo, "\"abci_info\""),
            (RpcMethod::TxSearch, "\"tx_search\""),
        ] {
            assert_eq!(serde_json::to_string(&method).unwrap(), name);
        }
    }

    #[test]
    fn abci_info_decodes_string_height_and_base64_hash() {
        let resp = parse(
            r#"{"jsonrpc":"2.0","id":1,"result":{"response":{
                "data":"bftx","version":"0.1.0",
                "last_block_height":"1042",
                "last_block_app_hash":"qqqqqg=="}}}"#,
        );
        let info = resp.into_result::<AbciInfoResult>().unwrap().into_chain_info().unwrap();
        assert_eq!(info.last_block_height, 1042);
        assert_eq!(info.last_block_app_hash, vec![0xAA, 0xAA, 0xAA, 0xAA]);
        assert_eq!(info.data, "bftx");
    }

    #[test]
    fn abci_info_before_first_commit_has_empty_salt() {
        let resp = parse(r#"{"jsonrpc":"2.0","id":1,"result":{"response":{}}}"#);
        let info = resp.into_result::<AbciInfoResult>().unwrap().into_chain_info().unwrap();
        assert_eq!(info.last_block_height, 0);
        assert!(info.last_block_app_hash.is_empty());
    }

    #[test]
    fn broadcast_result_maps_to_receipt() {
        let resp = parse(
            r#"{"jsonrpc":"2.0","id":"","result":{
                "code":0,"data":"","log":"","codespace":"",
                "hash":"4A1F0C"}}"#,
        );
        let receipt = resp.into_result::<BroadcastTxResult>().unwrap().into_receipt().unwrap();
        assert!(receipt.is_accepted());
        assert_eq!(receipt.hash, "4A1F0C");

        let rejected = parse(
            r#"{"jsonrpc":"2.0","id":2,"result":{"code":4,"log":"duplicate id","hash":"00"}}"#,
        );
        let receipt = rejected.into_result::<BroadcastTxResult>().unwrap().into_receipt().unwrap();
        assert!(!receipt.is_accepted());
        assert_eq!(receipt.log, "duplicate id");
    }

    #[test]
    fn tx_search_returns_earliest_commit() {
        let first = STANDARD.encode(b"first");
        let second = STANDARD.encode(b"second");
        let raw = format!(
            r#"{{"jsonrpc":"2.0","id":3,"result":{{"total_count":"2","txs":[
                {{"hash":"BB","height":"12","index":0,"tx":"{second}"}},
                {{"hash":"AA","height":"9","index":0,"tx":"{first}"}}]}}}}"#
        );
        let tx = parse(&raw)
            .into_result::<TxSearchResult>()
            .unwrap()
            .into_first_tx()
            .unwrap();
        assert_eq!(tx.as_deref(), Some(&b"first"[..]));
    }

    #[test]
    fn tx_search_without_hits_is_none() {
        let resp = parse(r#"{"jsonrpc":"2.0","id":3,"result":{"txs":[],"total_count":"0"}}"#);
        let tx = resp.into_result::<TxSearchResult>().unwrap().into_first_tx().unwrap();
        assert!(tx.is_none());
    }

    #[test]
    fn rpc_error_carries_detail() {
        let resp = parse(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32603,
                "message":"Internal error","data":"tx already exists in cache"}}"#,
        );
        match resp.into_result::<BroadcastTxResult>() {
            Err(NetworkError::Rpc { code, message }) => {
                assert_eq!(code, -32603);
                assert_eq!(message, "Internal error: tx already exists in cache");
            }
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[test]
    fn empty_envelope_is_a_decode_error() {
        let resp = parse(r#"{"jsonrpc":"2.0","id":1}"#);
        assert!(matches!(
            resp.into_result::<AbciInfoResult>(),
            Err(NetworkError::Decode(_))
        ));
    }

    #[test]
    fn bad_base64_is_a_decode_error() {
        let resp = parse(
            r#"{"jsonrpc":"2.0","id":1,"result":{"response":{"last_block_app_hash":"***"}}}"#,
        );
        assert!(matches!(
            resp.into_result::<AbciInfoResult>().unwrap().into_chain_info(),
            Err(NetworkError::Decode(_))
        ));
    }

    #[test]
    fn client_keeps_configured_url() {
        let client = TendermintClient::new("http://127.0.0.1:46657", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:46657");
    }
}
