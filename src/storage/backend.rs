//! Storage Backend Interface
//!
//! The store facade never touches rows directly. It talks to a
//! [`ShardBackend`], which owns the physical tables and exposes the handful of
//! single-statement operations the facade needs.
//!
//! ## Contract
//!
//! - Table names are only ever produced by the shard table set; keys, values
//!   and timestamps are always passed as parameters.
//! - "No rows" is reported as `Ok(None)` / `Ok(0)`, never as an error.
//! - Each operation is atomic on its own. Nothing spans two calls.
//! - Implementations must be safe to share across concurrent requests.
//!
//! Rows that fail the liveness predicate are never removed by this crate.
//! Physical reclamation belongs to an external compactor that deletes rows
//! whose `expires_at` lies past some grace period; it would be added here as a
//! separate `purge_dead` operation.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A raw row as held by the backend. The value is an opaque serialized blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub key: String,
    pub value: Bytes,
    pub expires_at: DateTime<Utc>,
}

/// Failures reported by a storage backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("table '{0}' does not exist")]
    MissingTable(String),

    #[error("invalid table name '{0}'")]
    InvalidTable(String),
}

/// Per-table storage operations used by the store facade.
#[async_trait]
pub trait ShardBackend: Send + Sync + 'static {
    /// Creates the table if it does not exist yet. Idempotent.
    async fn ensure_table(&self, table: &str) -> Result<(), BackendError>;

    /// Inserts the row, or overwrites value and `expires_at` if the key exists.
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        value: Bytes,
        expires_at: DateTime<Utc>,
    ) -> Result<(), BackendError>;

    /// Point read of the row for `key`, only if `expires_at > now`.
    async fn get_live(
        &self,
        table: &str,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredRow>, BackendError>;

    /// Sets `expires_at` on the row for `key`, only if it is live at `now`.
    ///
    /// Returns the number of rows affected.
    async fn expire_if_live(
        &self,
        table: &str,
        key: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, BackendError>;

    /// Every row in the table, live or not, in the table's natural order.
    async fn scan(&self, table: &str) -> Result<Vec<StoredRow>, BackendError>;
}
