//! Hash Router
//!
//! Maps a key to the one shard that owns it.
//!
//! The checksum is the IEEE CRC-32 of the key's UTF-8 bytes, taken modulo the
//! shard count. Existing data was laid out with exactly this function, so it
//! must stay bit-exact: switching hashes would orphan every stored row.

use std::fmt;
use std::num::NonZeroUsize;

use crate::error::{KvError, Result};

/// Upper bound on the shard count. Keeps the modulus inside u32.
pub const MAX_SHARDS: usize = 4096;

/// Number of shards. Always between 1 and [`MAX_SHARDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShardCount(NonZeroUsize);

impl ShardCount {
    /// Rejects zero and counts above [`MAX_SHARDS`]. Fatal at startup, never a
    /// per-request error.
    pub fn new(count: usize) -> Result<Self> {
        if count > MAX_SHARDS {
            return Err(KvError::Config(format!(
                "shard count {} exceeds the maximum of {}",
                count, MAX_SHARDS
            )));
        }
        NonZeroUsize::new(count)
            .map(Self)
            .ok_or_else(|| KvError::Config("shard count must be at least 1".into()))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for ShardCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// IEEE CRC-32 of the key bytes.
#[inline]
pub fn checksum(key: &str) -> u32 {
    crc32fast::hash(key.as_bytes())
}

/// Determines which shard a key belongs to.
#[inline]
pub fn shard_index(key: &str, shards: ShardCount) -> usize {
    // Reduce in u32 space so the result matches other implementations of the layout
    (checksum(key) % shards.get() as u32) as usize
}
