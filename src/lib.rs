//! # ShardKV - A Sharded JSON Key-Value Store
//!
//! ShardKV stores JSON documents under string keys, spreads them over a fixed
//! number of backing tables by a CRC-32 of the key, and gives every entry a
//! time-to-live. Liveness is derived from a single `expires_at` timestamp, and
//! deletes are soft: they move that timestamp into the distant past.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              ShardKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ HTTP Server │───>│  Handlers   │───>│   KvStore   │                  │
//! │  │   (axum)    │    │ (JSON bind) │    │  (facade)   │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                    ┌──────────────────────────┼───────────────┐         │
//! │                    ▼                          ▼               ▼         │
//! │           ┌──────────────┐          ┌──────────────┐  ┌─────────────┐   │
//! │           │ Hash Router  │          │  Lifecycle   │  │ShardBackend │   │
//! │           │ crc32 mod N  │          │ TTL/liveness │  │ kv_0..kv_N  │   │
//! │           └──────────────┘          └──────────────┘  └─────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use shardkv::{Config, KvStore, MemoryBackend};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let config = Config::builder().shard_count(4).build();
//! let store = KvStore::open(&config, Arc::new(MemoryBackend::new())).await.unwrap();
//!
//! let value = json!({"age": 30}).as_object().cloned().unwrap();
//! store.put("alice", &value).await.unwrap();
//!
//! let entry = store.get("alice").await.unwrap();
//! assert_eq!(entry.value, value);
//!
//! store.delete("alice").await.unwrap();
//! assert!(store.get("alice").await.is_err());
//! # });
//! ```
//!
//! ## Module Overview
//!
//! - [`shard`]: Key → shard routing and the shard table names
//! - [`lifecycle`]: TTL, liveness predicate and soft-delete sentinel
//! - [`storage`]: Backend trait and the in-memory backend
//! - [`store`]: The `KvStore` facade (put, get, delete, scan_all)
//! - [`http`]: JSON API over axum
//!
//! ## Design Highlights
//!
//! ### Stable Routing
//!
//! A key's shard is `crc32(key) % N`, the IEEE checksum. The same key always
//! lands on the same table across restarts and across implementations, as long
//! as N and the base table name stay the same.
//!
//! ### One Timestamp, Three States
//!
//! Live, expired and deleted are all read off `expires_at`. A delete writes
//! `0001-01-01T00:00:00Z`, which can never be live, and a later put revives the
//! key with a fresh TTL.
//!
//! ### No Reclamation
//!
//! Expired and deleted rows stay in their tables. Removing them is left to an
//! external compaction job.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod shard;
pub mod storage;
pub mod store;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{KvError, Result};
pub use lifecycle::{Clock, LifecyclePolicy, ManualClock, SystemClock};
pub use shard::{shard_index, ShardCount, ShardTableSet};
pub use storage::{MemoryBackend, ShardBackend};
pub use store::{Document, Entry, KvStore};

/// The default port ShardKV listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host ShardKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of ShardKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
