//! In-Memory Storage Backend
//!
//! A thread-safe [`ShardBackend`] that keeps every table in process memory.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MemoryBackend                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │  kv_0   │ │  kv_1   │ │  kv_2   │ │  kv_N   │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ BTreeMap│ │ BTreeMap│ │ BTreeMap│ │ BTreeMap│           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each table has its own lock, so requests routed to different shards never
//! contend. Every operation runs under a single lock acquisition, which gives
//! it the same atomicity as a single SQL statement. Rows are kept ordered by
//! key, which is the order a full scan returns them in.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::backend::{BackendError, ShardBackend, StoredRow};
use crate::lifecycle::is_live_at;

#[derive(Debug, Clone)]
struct Row {
    value: Bytes,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Table {
    rows: RwLock<BTreeMap<String, Row>>,
}

/// Concurrent in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a table by name.
    fn table(&self, name: &str) -> Result<Arc<Table>, BackendError> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::MissingTable(name.to_string()))
    }

    /// Removes a table and all of its rows.
    ///
    /// Returns `true` if the table existed.
    pub fn drop_table(&self, name: &str) -> bool {
        self.tables.write().remove(name).is_some()
    }

    /// Returns true if the table exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Number of physical rows in a table, including expired and deleted ones.
    pub fn row_count(&self, name: &str) -> Option<usize> {
        self.tables.read().get(name).map(|t| t.rows.read().len())
    }

    /// Raw row lookup, ignoring liveness.
    pub fn raw_row(&self, table: &str, key: &str) -> Option<StoredRow> {
        let table = self.table(table).ok()?;
        let rows = table.rows.read();
        rows.get(key).map(|row| StoredRow {
            key: key.to_string(),
            value: row.value.clone(),
            expires_at: row.expires_at,
        })
    }
}

#[async_trait]
impl ShardBackend for MemoryBackend {
    async fn ensure_table(&self, table: &str) -> Result<(), BackendError> {
        if table.is_empty() {
            return Err(BackendError::InvalidTable(table.to_string()));
        }

        let mut tables = self.tables.write();
        tables.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn upsert(
        &self,
        table: &str,
        key: &str,
        value: Bytes,
        expires_at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let table = self.table(table)?;
        let mut rows = table.rows.write();

        match rows.get_mut(key) {
            Some(row) => {
                row.value = value;
                row.expires_at = expires_at;
            }
            None => {
                rows.insert(key.to_string(), Row { value, expires_at });
            }
        }

        Ok(())
    }

    async fn get_live(
        &self,
        table: &str,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredRow>, BackendError> {
        let table = self.table(table)?;
        let rows = table.rows.read();

        Ok(rows
            .get(key)
            .filter(|row| is_live_at(row.expires_at, now))
            .map(|row| StoredRow {
                key: key.to_string(),
                value: row.value.clone(),
                expires_at: row.expires_at,
            }))
    }

    async fn expire_if_live(
        &self,
        table: &str,
        key: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, BackendError> {
        let table = self.table(table)?;
        let mut rows = table.rows.write();

        match rows.get_mut(key) {
            Some(row) if is_live_at(row.expires_at, now) => {
                row.expires_at = expires_at;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn scan(&self, table: &str) -> Result<Vec<StoredRow>, BackendError> {
        let table = self.table(table)?;
        let rows = table.rows.read();

        Ok(rows
            .iter()
            .map(|(key, row)| StoredRow {
                key: key.clone(),
                value: row.value.clone(),
                expires_at: row.expires_at,
            })
            .collect())
    }
}
