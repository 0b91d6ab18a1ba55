use serde::{Deserialize, Serialize};

/// Log record as returned by the indexing API's `getLogs` action.
///
/// Every numeric field is a hex quantity string. Zero is sometimes rendered
/// as a bare `"0x"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    #[serde(default)]
    pub log_index: String,
    #[serde(default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub transaction_index: String,
    #[serde(default)]
    pub time_stamp: String,
}

/// Envelope of every indexing API response.
///
/// `result` is the log array on success and an error string otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub result: serde_json::Value,
}

/// Message the API uses for an empty (but successful) query.
pub const NO_RECORDS_FOUND: &str = "No records found";
