//! HTTP Wire Types
//!
//! Endpoint paths and the JSON bodies exchanged with clients.

use serde::{Deserialize, Serialize};

use crate::store::{Document, Entry, StatsSnapshot};

// --- API Endpoints ---

/// Welcome page.
pub const ENDPOINT_INDEX: &str = "/";
/// Every live entry across all shards.
pub const ENDPOINT_ALL: &str = "/kv/all";
/// Point read and delete.
pub const ENDPOINT_KEY: &str = "/kv/:key";
/// Write.
pub const ENDPOINT_PUT: &str = "/kv";
/// Operation counters.
pub const ENDPOINT_STATS: &str = "/stats";

// --- Data Transfer Objects ---

/// Body of `POST /kv`.
///
/// Both fields are required and `value` must be a JSON object.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: String,
    pub value: Document,
}

/// A plain acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response of `GET /kv/{key}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemResponse {
    pub item: Entry,
}

/// Response of `GET /kv/all`. `items` is empty on 404.
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsResponse {
    pub message: String,
    pub items: Vec<Entry>,
}

/// Any failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response of `GET /stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub version: &'static str,
    pub shards: usize,
    pub ttl_secs: i64,
    #[serde(flatten)]
    pub ops: StatsSnapshot,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
