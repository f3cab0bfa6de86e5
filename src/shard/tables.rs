//! Shard Table Set
//!
//! Holds the fixed mapping from shard index to physical table name:
//!
//! ```text
//!   base = "kv", shards = 4   ──>   kv_0  kv_1  kv_2  kv_3
//! ```
//!
//! The names are derived once at startup from configuration and never from
//! request data. They must not change between restarts, otherwise rows written
//! under the old names become unreachable.

use tracing::{debug, info};

use super::router::{shard_index, ShardCount};
use crate::error::{KvError, Result};
use crate::storage::ShardBackend;

/// Longest accepted base name. Leaves room for the `_<index>` suffix.
pub const MAX_BASE_NAME_LEN: usize = 48;

/// One shard: its index and the name of the table that backs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardHandle<'a> {
    pub index: usize,
    pub table: &'a str,
}

/// The routing table from shard index to table name.
#[derive(Debug, Clone)]
pub struct ShardTableSet {
    base_name: String,
    shards: ShardCount,
    tables: Vec<String>,
}

impl ShardTableSet {
    /// Builds `<base>_0 .. <base>_{N-1}`.
    ///
    /// The base name must be a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
    pub fn new(base_name: &str, shards: ShardCount) -> Result<Self> {
        validate_base_name(base_name)?;

        let tables = (0..shards.get())
            .map(|i| format!("{}_{}", base_name, i))
            .collect();

        Ok(Self {
            base_name: base_name.to_string(),
            shards,
            tables,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn shard_count(&self) -> ShardCount {
        self.shards
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Always false: there is at least one shard.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Gets the handle for shard `index`, if it exists.
    pub fn table(&self, index: usize) -> Option<ShardHandle<'_>> {
        self.tables.get(index).map(|name| ShardHandle {
            index,
            table: name.as_str(),
        })
    }

    /// Gets the handle of the shard that owns `key`.
    pub fn table_for_key(&self, key: &str) -> ShardHandle<'_> {
        let index = shard_index(key, self.shards);
        ShardHandle {
            index,
            table: &self.tables[index],
        }
    }

    /// All shards in index order.
    pub fn iter(&self) -> impl Iterator<Item = ShardHandle<'_>> {
        self.tables
            .iter()
            .enumerate()
            .map(|(index, name)| ShardHandle {
                index,
                table: name.as_str(),
            })
    }

    /// Makes sure every shard table exists in the backend.
    pub async fn bootstrap(&self, backend: &dyn ShardBackend) -> Result<()> {
        for shard in self.iter() {
            backend
                .ensure_table(shard.table)
                .await
                .map_err(|source| KvError::Storage {
                    shard: shard.index,
                    source,
                })?;
            debug!(shard = shard.index, table = shard.table, "Shard table ready");
        }

        info!(
            shards = self.len(),
            base = %self.base_name,
            "Shard tables bootstrapped"
        );
        Ok(())
    }
}

fn validate_base_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KvError::Config("base table name must not be empty".into()));
    }
    if name.len() > MAX_BASE_NAME_LEN {
        return Err(KvError::Config(format!(
            "base table name is longer than {} bytes",
            MAX_BASE_NAME_LEN
        )));
    }

    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(KvError::Config(format!(
            "base table name '{}' is not a valid identifier",
            name
        )));
    }

    Ok(())
}
