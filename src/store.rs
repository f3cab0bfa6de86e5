//! KV Store Facade
//!
//! The single logical keyspace that callers see. Every operation routes its
//! key to exactly one shard table and applies the lifecycle rules there:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         KvStore                             │
//! │                                                             │
//! │   put / get / delete          scan_all                      │
//! │          │                       │                          │
//! │          ▼                       ▼                          │
//! │   table_for_key(key)      for every shard                   │
//! │          │                       │                          │
//! │          ▼                       ▼                          │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │  kv_0   │ │  kv_1   │ │  kv_2   │ │  kv_N   │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! │                  ShardBackend                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! There is no per-key lock in this layer. Each request issues one backend
//! statement (N for a scan) and relies on that statement's atomicity. Two
//! concurrent `put`s on the same key race at the backend and the last one to
//! commit wins; a `get` racing a `put` may see either version.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::lifecycle::{is_live_at, soft_delete_sentinel, LifecyclePolicy};
use crate::shard::{ShardCount, ShardHandle, ShardTableSet};
use crate::storage::{ShardBackend, StoredRow};

/// A JSON document stored under a key.
pub type Document = Map<String, Value>;

/// A live entry as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: Document,
    /// Rendered in the configured reference offset
    #[serde(rename = "expired_at")]
    pub expires_at: DateTime<FixedOffset>,
}

/// Operation counters.
#[derive(Debug, Default)]
pub struct StoreStats {
    puts: AtomicU64,
    gets: AtomicU64,
    deletes: AtomicU64,
    scans: AtomicU64,
    not_found: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub puts: u64,
    pub gets: u64,
    pub deletes: u64,
    pub scans: u64,
    pub not_found: u64,
    pub failures: u64,
}

impl StoreStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            puts: self.puts.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Counts the outcome of an operation.
    fn record<T>(&self, result: &Result<T>) {
        match result {
            Ok(_) => {}
            Err(KvError::NotFound) => {
                self.not_found.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if e.is_internal() => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {}
        }
    }
}

/// The sharded key-value store.
///
/// Designed to be wrapped in an `Arc` and shared across all request handlers.
pub struct KvStore {
    tables: ShardTableSet,
    policy: LifecyclePolicy,
    backend: Arc<dyn ShardBackend>,
    stats: StoreStats,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("tables", &self.tables)
            .field("policy", &self.policy)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl KvStore {
    /// Creates a store over already-bootstrapped tables.
    pub fn new(
        tables: ShardTableSet,
        policy: LifecyclePolicy,
        backend: Arc<dyn ShardBackend>,
    ) -> Self {
        Self {
            tables,
            policy,
            backend,
            stats: StoreStats::default(),
        }
    }

    /// Validates the config, bootstraps every shard table and returns the store.
    pub async fn open(config: &Config, backend: Arc<dyn ShardBackend>) -> Result<Self> {
        config.validate()?;

        let shards = ShardCount::new(config.shard_count)?;
        let tables = ShardTableSet::new(&config.base_table_name, shards)?;
        let policy = LifecyclePolicy::with_system_clock(config.ttl, config.reference_offset)?;

        tables.bootstrap(backend.as_ref()).await?;

        Ok(Self::new(tables, policy, backend))
    }

    pub fn tables(&self) -> &ShardTableSet {
        &self.tables
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Writes `value` under `key` with a fresh TTL.
    ///
    /// Inserts if the key is new, otherwise overwrites value and expiry
    /// regardless of whether the old row was live, expired or deleted.
    pub async fn put(&self, key: &str, value: &Document) -> Result<()> {
        self.stats.puts.fetch_add(1, Ordering::Relaxed);
        let result = self.put_inner(key, value).await;
        self.stats.record(&result);
        result
    }

    async fn put_inner(&self, key: &str, value: &Document) -> Result<()> {
        validate_key(key)?;
        let shard = self.tables.table_for_key(key);

        let blob = serde_json::to_vec(value).map_err(|source| {
            error!(shard = shard.index, key = key, error = %source, "Failed to encode value");
            KvError::Encoding {
                shard: shard.index,
                key: key.to_string(),
                source,
            }
        })?;

        let expires_at = self.policy.expires_at_for_write();
        debug!(
            shard = shard.index,
            table = shard.table,
            key = key,
            expires_at = %self.policy.render(expires_at),
            "Upserting entry"
        );

        self.backend
            .upsert(shard.table, key, Bytes::from(blob), expires_at)
            .await
            .map_err(|source| storage_error(shard, key, source))
    }

    /// Reads the live entry for `key`.
    pub async fn get(&self, key: &str) -> Result<Entry> {
        self.stats.gets.fetch_add(1, Ordering::Relaxed);
        let result = self.get_inner(key).await;
        self.stats.record(&result);
        result
    }

    async fn get_inner(&self, key: &str) -> Result<Entry> {
        validate_key(key)?;
        let shard = self.tables.table_for_key(key);

        let row = self
            .backend
            .get_live(shard.table, key, self.policy.now())
            .await
            .map_err(|source| storage_error(shard, key, source))?;

        match row {
            Some(row) => self.decode(shard, row),
            None => {
                debug!(shard = shard.index, table = shard.table, key = key, "Key not found");
                Err(KvError::NotFound)
            }
        }
    }

    /// Soft-deletes the entry for `key`.
    ///
    /// Only a live row is affected; deleting an expired, already deleted or
    /// unknown key reports `NotFound`. The row stays in its table.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        let result = self.delete_inner(key).await;
        self.stats.record(&result);
        result
    }

    async fn delete_inner(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let shard = self.tables.table_for_key(key);

        let affected = self
            .backend
            .expire_if_live(shard.table, key, soft_delete_sentinel(), self.policy.now())
            .await
            .map_err(|source| storage_error(shard, key, source))?;

        if affected == 0 {
            debug!(shard = shard.index, table = shard.table, key = key, "Nothing to delete");
            return Err(KvError::NotFound);
        }

        debug!(shard = shard.index, table = shard.table, key = key, "Soft-deleted entry");
        Ok(())
    }

    /// Every live entry across all shards.
    ///
    /// Shards are visited in index order and each shard's rows keep the order
    /// the backend returned them in. A shard that fails is logged and skipped;
    /// only when every shard fails is the scan an error. An empty result is
    /// not an error.
    pub async fn scan_all(&self) -> Result<Vec<Entry>> {
        self.stats.scans.fetch_add(1, Ordering::Relaxed);
        let result = self.scan_all_inner().await;
        self.stats.record(&result);
        result
    }

    async fn scan_all_inner(&self) -> Result<Vec<Entry>> {
        let now = self.policy.now();
        let mut entries = Vec::new();
        let mut failures = Vec::new();

        for shard in self.tables.iter() {
            let rows = match self.backend.scan(shard.table).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(
                        shard = shard.index,
                        table = shard.table,
                        error = %e,
                        "Skipping shard in scan"
                    );
                    failures.push(format!("{}: {}", shard.table, e));
                    continue;
                }
            };

            for row in rows {
                if !is_live_at(row.expires_at, now) {
                    continue;
                }
                // Corrupt rows are already logged by decode()
                if let Ok(entry) = self.decode(shard, row) {
                    entries.push(entry);
                }
            }
        }

        if failures.len() == self.tables.len() {
            error!(shards = failures.len(), "Scan failed on every shard");
            return Err(KvError::ScanFailed {
                shards: failures.len(),
                detail: failures.join("; "),
            });
        }

        debug!(
            entries = entries.len(),
            failed_shards = failures.len(),
            "Scan complete"
        );
        Ok(entries)
    }

    /// Turns a raw row into an entry. An empty blob decodes to an empty document.
    fn decode(&self, shard: ShardHandle<'_>, row: StoredRow) -> Result<Entry> {
        let value = if row.value.is_empty() {
            Document::new()
        } else {
            serde_json::from_slice(&row.value).map_err(|source| {
                error!(
                    shard = shard.index,
                    table = shard.table,
                    key = %row.key,
                    error = %source,
                    "Failed to decode stored value"
                );
                KvError::Decoding {
                    shard: shard.index,
                    key: row.key.clone(),
                    source,
                }
            })?
        };

        Ok(Entry {
            expires_at: self.policy.render(row.expires_at),
            key: row.key,
            value,
        })
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::Validation("key is required".into()));
    }
    Ok(())
}

fn storage_error(
    shard: ShardHandle<'_>,
    key: &str,
    source: crate::storage::BackendError,
) -> KvError {
    error!(
        shard = shard.index,
        table = shard.table,
        key = key,
        error = %source,
        "Storage operation failed"
    );
    KvError::Storage {
        shard: shard.index,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Clock, ManualClock};
    use crate::storage::MemoryBackend;
    use chrono::{TimeDelta, Utc};
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    struct Fixture {
        store: KvStore,
        backend: Arc<MemoryBackend>,
        clock: Arc<ManualClock>,
    }

    async fn fixture(shards: usize) -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(ManualClock::starting_now());
        let tables = ShardTableSet::new("kv", ShardCount::new(shards).unwrap()).unwrap();
        tables.bootstrap(&*backend).await.unwrap();
        let policy = LifecyclePolicy::new(
            Duration::from_secs(600),
            FixedOffset::east_opt(19800).unwrap(),
            clock.clone(),
        )
        .unwrap();

        Fixture {
            store: KvStore::new(tables, policy, backend.clone()),
            backend,
            clock,
        }
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let f = fixture(4).await;
        let value = doc(json!({"age": 30, "tags": ["a", "b"], "nested": {"x": null}}));

        f.store.put("alice", &value).await.unwrap();

        let entry = f.store.get("alice").await.unwrap();
        assert_eq!(entry.key, "alice");
        assert_eq!(entry.value, value);
        assert!(entry.expires_at > f.clock.now());
        assert_eq!(entry.expires_at.offset().local_minus_utc(), 19800);
    }

    #[tokio::test]
    async fn test_alice_scenario() {
        let f = fixture(4).await;

        f.store.put("alice", &doc(json!({"age": 30}))).await.unwrap();
        f.store.put("bob", &doc(json!({"age": 41}))).await.unwrap();

        // alice lives on shard 3
        assert!(f.backend.raw_row("kv_3", "alice").is_some());

        let entry = f.store.get("alice").await.unwrap();
        assert_eq!(entry.value, doc(json!({"age": 30})));

        f.store.delete("alice").await.unwrap();
        assert!(matches!(f.store.get("alice").await, Err(KvError::NotFound)));

        let keys: Vec<String> = f
            .store
            .scan_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["bob"]);

        // Soft delete keeps the row with the sentinel timestamp
        let row = f.backend.raw_row("kv_3", "alice").unwrap();
        assert_eq!(row.expires_at, soft_delete_sentinel());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let f = fixture(4).await;
        f.store.put("session", &doc(json!({"token": "abc"}))).await.unwrap();

        f.clock.advance(TimeDelta::minutes(9));
        assert!(f.store.get("session").await.is_ok());

        f.clock.advance(TimeDelta::minutes(2));
        assert!(matches!(f.store.get("session").await, Err(KvError::NotFound)));
        assert!(f.store.scan_all().await.unwrap().is_empty());

        // Expired rows can't be deleted either
        assert!(matches!(f.store.delete("session").await, Err(KvError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_succeeds_once() {
        let f = fixture(4).await;
        f.store.put("k", &doc(json!({}))).await.unwrap();

        f.store.delete("k").await.unwrap();
        assert!(matches!(f.store.delete("k").await, Err(KvError::NotFound)));
        assert!(matches!(f.store.delete("never").await, Err(KvError::NotFound)));
    }

    #[tokio::test]
    async fn test_revival_after_delete_and_expiry() {
        let f = fixture(4).await;

        f.store.put("k", &doc(json!({"v": 1}))).await.unwrap();
        f.store.delete("k").await.unwrap();
        f.store.put("k", &doc(json!({"v": 2}))).await.unwrap();
        assert_eq!(f.store.get("k").await.unwrap().value, doc(json!({"v": 2})));

        f.clock.advance(TimeDelta::minutes(15));
        assert!(f.store.get("k").await.is_err());
        f.store.put("k", &doc(json!({"v": 3}))).await.unwrap();
        assert_eq!(f.store.get("k").await.unwrap().value, doc(json!({"v": 3})));
    }

    #[tokio::test]
    async fn test_put_overwrites_and_refreshes_ttl() {
        let f = fixture(2).await;

        f.store.put("k", &doc(json!({"a": 1, "b": 2}))).await.unwrap();
        let first = f.store.get("k").await.unwrap().expires_at;

        f.clock.advance(TimeDelta::minutes(5));
        f.store.put("k", &doc(json!({"c": 3}))).await.unwrap();

        let entry = f.store.get("k").await.unwrap();
        // Full overwrite, no merge
        assert_eq!(entry.value, doc(json!({"c": 3})));
        assert_eq!(entry.expires_at - first, TimeDelta::minutes(5));

        // Still live past the first expiry
        f.clock.advance(TimeDelta::minutes(7));
        assert!(f.store.get("k").await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_key_rejected_before_storage() {
        let f = fixture(1).await;
        // No table behind the store: validation must fail before any backend call
        f.backend.drop_table("kv_0");

        assert!(matches!(f.store.get("").await, Err(KvError::Validation(_))));
        assert!(matches!(f.store.delete("").await, Err(KvError::Validation(_))));
        assert!(matches!(
            f.store.put("", &Document::new()).await,
            Err(KvError::Validation(_))
        ));
        assert_eq!(f.store.stats().failures, 0);
    }

    #[tokio::test]
    async fn test_scan_completeness() {
        let f = fixture(8).await;

        let keys: Vec<String> = (0..200).map(|i| format!("user:{}", i)).collect();
        for (i, key) in keys.iter().enumerate() {
            f.store.put(key, &doc(json!({ "n": i }))).await.unwrap();
        }
        // Rewrites must not duplicate
        f.store.put("user:7", &doc(json!({"n": 7}))).await.unwrap();

        let entries = f.store.scan_all().await.unwrap();
        assert_eq!(entries.len(), keys.len());

        let seen: HashSet<String> = entries.iter().map(|e| e.key.clone()).collect();
        assert_eq!(seen.len(), keys.len());
        for key in &keys {
            assert!(seen.contains(key));
        }

        // Shard order, then key order within a shard
        let shard_of: Vec<usize> = entries
            .iter()
            .map(|e| f.store.tables().table_for_key(&e.key).index)
            .collect();
        assert!(shard_of.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_scan_empty_is_not_an_error() {
        let f = fixture(4).await;
        assert!(f.store.scan_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_skips_failed_shard() {
        let f = fixture(4).await;

        f.store.put("alice", &doc(json!({"age": 30}))).await.unwrap(); // shard 3
        f.store.put("bob", &doc(json!({"age": 41}))).await.unwrap(); // shard 0

        f.backend.drop_table("kv_3");

        let entries = f.store.scan_all().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "bob");

        // Point operations on the broken shard surface a storage error
        assert!(matches!(
            f.store.get("alice").await,
            Err(KvError::Storage { shard: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_scan_fails_when_every_shard_fails() {
        let f = fixture(2).await;
        f.backend.drop_table("kv_0");
        f.backend.drop_table("kv_1");

        match f.store.scan_all().await {
            Err(KvError::ScanFailed { shards, detail }) => {
                assert_eq!(shards, 2);
                assert!(detail.contains("kv_0"));
                assert!(detail.contains("kv_1"));
            }
            other => panic!("expected ScanFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_corrupt_value() {
        let f = fixture(4).await;
        let table = f.store.tables().table_for_key("broken").table.to_string();
        let live = Utc::now() + TimeDelta::hours(1);

        f.backend
            .upsert(&table, "broken", Bytes::from_static(b"{not json"), live)
            .await
            .unwrap();
        f.store.put("fine", &doc(json!({"ok": true}))).await.unwrap();

        assert!(matches!(
            f.store.get("broken").await,
            Err(KvError::Decoding { .. })
        ));

        // Scan keeps going past the corrupt row
        let keys: Vec<String> = f
            .store
            .scan_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["fine"]);
    }

    #[tokio::test]
    async fn test_empty_blob_decodes_to_empty_document() {
        let f = fixture(1).await;
        let live = Utc::now() + TimeDelta::hours(1);
        f.backend
            .upsert("kv_0", "blank", Bytes::new(), live)
            .await
            .unwrap();

        assert!(f.store.get("blank").await.unwrap().value.is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let f = fixture(4).await;

        f.store.put("a", &doc(json!({}))).await.unwrap();
        f.store.get("a").await.unwrap();
        let _ = f.store.get("missing").await;
        f.store.delete("a").await.unwrap();
        f.store.scan_all().await.unwrap();

        let stats = f.store.stats();
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.gets, 2);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.scans, 1);
        assert_eq!(stats.not_found, 1);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn test_open_bootstraps_tables() {
        let backend = Arc::new(MemoryBackend::new());
        let config = Config::builder()
            .shard_count(3)
            .base_table_name("entries")
            .build();

        let store = KvStore::open(&config, backend.clone()).await.unwrap();
        assert_eq!(store.tables().len(), 3);
        assert!(backend.has_table("entries_0"));
        assert!(backend.has_table("entries_2"));

        store.put("k", &doc(json!({"v": 1}))).await.unwrap();
        assert!(store.get("k").await.is_ok());
    }

    #[tokio::test]
    async fn test_open_rejects_zero_shards() {
        let backend = Arc::new(MemoryBackend::new());
        let config = Config::builder().shard_count(0).build();

        assert!(matches!(
            KvStore::open(&config, backend).await,
            Err(KvError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let f = fixture(4).await;
        let store = Arc::new(f.store);
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for j in 0..50 {
                    let key = format!("key-{}-{}", i, j);
                    store.put(&key, &doc(json!({ "i": i, "j": j }))).await.unwrap();
                    store.get(&key).await.unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.scan_all().await.unwrap().len(), 500);
    }
}
