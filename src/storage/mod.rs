//! Storage Module
//!
//! The persistence side of the store: the [`ShardBackend`] trait the facade is
//! written against, and [`MemoryBackend`], a concurrent in-process
//! implementation of it.
//!
//! ## Example
//!
//! ```
//! use shardkv::storage::{MemoryBackend, ShardBackend};
//! use bytes::Bytes;
//! use chrono::{TimeDelta, Utc};
//!
//! # tokio_test::block_on(async {
//! let backend = MemoryBackend::new();
//! backend.ensure_table("kv_0").await.unwrap();
//!
//! let now = Utc::now();
//! backend
//!     .upsert("kv_0", "name", Bytes::from(r#"{"v":1}"#), now + TimeDelta::minutes(10))
//!     .await
//!     .unwrap();
//!
//! assert!(backend.get_live("kv_0", "name", now).await.unwrap().is_some());
//! # });
//! ```

pub mod backend;
pub mod memory;

// Re-export commonly used types
pub use backend::{BackendError, ShardBackend, StoredRow};
pub use memory::MemoryBackend;
