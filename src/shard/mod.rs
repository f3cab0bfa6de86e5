//! Shard Routing Module
//!
//! Deterministic key → shard → table mapping.
//!
//! ```text
//!   key ──crc32──> checksum ──mod N──> index ──> "<base>_<index>"
//! ```
//!
//! - `router`: the checksum and the `ShardCount` newtype
//! - `tables`: the fixed table names and backend bootstrap

pub mod router;
pub mod tables;

pub use router::{checksum, shard_index, ShardCount, MAX_SHARDS};
pub use tables::{ShardHandle, ShardTableSet};
