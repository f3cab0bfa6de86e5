//! Error types for ShardKV
//!
//! `KvError` is what the store facade returns to callers. Storage backends
//! report through their own `BackendError`, which the facade wraps together
//! with the shard the failure happened on.

use crate::storage::BackendError;
use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for store operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    /// Rejected before any routing or storage access
    #[error("validation error: {0}")]
    Validation(String),

    /// No live entry for the key. An absence signal, not a failure.
    #[error("key not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("failed to encode value for key '{key}' on shard {shard}: {source}")]
    Encoding {
        shard: usize,
        key: String,
        source: serde_json::Error,
    },

    #[error("failed to decode value for key '{key}' on shard {shard}: {source}")]
    Decoding {
        shard: usize,
        key: String,
        source: serde_json::Error,
    },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("storage error on shard {shard}: {source}")]
    Storage { shard: usize, source: BackendError },

    /// Every shard failed during a full scan
    #[error("scan failed on all {shards} shards: {detail}")]
    ScanFailed { shards: usize, detail: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// Returns true for failures that indicate a broken backend or corrupt
    /// data rather than a bad request or a missing key.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            KvError::Encoding { .. }
                | KvError::Decoding { .. }
                | KvError::Storage { .. }
                | KvError::ScanFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_classification() {
        assert!(!KvError::NotFound.is_internal());
        assert!(!KvError::Validation("key is required".into()).is_internal());
        assert!(!KvError::Config("bad".into()).is_internal());

        let storage = KvError::Storage {
            shard: 2,
            source: BackendError::MissingTable("kv_2".into()),
        };
        assert!(storage.is_internal());
        assert_eq!(
            storage.to_string(),
            "storage error on shard 2: table 'kv_2' does not exist"
        );

        let scan = KvError::ScanFailed {
            shards: 4,
            detail: "down".into(),
        };
        assert!(scan.is_internal());
    }

    #[test]
    fn test_decoding_error_carries_context() {
        let source = serde_json::from_slice::<serde_json::Value>(b"{not json").unwrap_err();
        let err = KvError::Decoding {
            shard: 1,
            key: "alice".into(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("alice"));
        assert!(msg.contains("shard 1"));
    }
}
