//! Configuration for ShardKV
//!
//! Built once at process start and passed explicitly to the constructors that
//! need it. Nothing here changes after startup.

use chrono::{FixedOffset, Offset, Utc};
use std::time::Duration;

use crate::error::{KvError, Result};
use crate::shard::{ShardCount, ShardTableSet};

/// Default entry lifetime (10 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Default reference offset, +05:30
const DEFAULT_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Main configuration for a ShardKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Sharding
    // -------------------------------------------------------------------------
    /// Number of shard tables. Changing it re-routes keys; there is no resharding.
    pub shard_count: usize,

    /// Tables are named `{base_table_name}_{index}`
    pub base_table_name: String,

    // -------------------------------------------------------------------------
    // Entry Lifecycle
    // -------------------------------------------------------------------------
    /// Lifetime given to every written entry
    pub ttl: Duration,

    /// Offset used when rendering `expires_at` to clients
    pub reference_offset: FixedOffset,

    // -------------------------------------------------------------------------
    // Network
    // -------------------------------------------------------------------------
    /// HTTP listen address
    pub listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_count: 4,
            base_table_name: "kv_store".to_string(),
            ttl: DEFAULT_TTL,
            reference_offset: FixedOffset::east_opt(DEFAULT_OFFSET_SECS).unwrap_or(Utc.fix()),
            listen_addr: format!("{}:{}", crate::DEFAULT_HOST, crate::DEFAULT_PORT),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Checks every startup invariant. Any failure here is fatal.
    pub fn validate(&self) -> Result<()> {
        let shards = ShardCount::new(self.shard_count)?;
        ShardTableSet::new(&self.base_table_name, shards)?;

        if self.ttl.is_zero() {
            return Err(KvError::Config("ttl must be greater than zero".into()));
        }
        if self.listen_addr.is_empty() {
            return Err(KvError::Config("listen address must not be empty".into()));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the number of shards
    pub fn shard_count(mut self, count: usize) -> Self {
        self.config.shard_count = count;
        self
    }

    /// Set the base table name
    pub fn base_table_name(mut self, name: impl Into<String>) -> Self {
        self.config.base_table_name = name.into();
        self
    }

    /// Set the entry TTL
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Set the reference offset
    pub fn reference_offset(mut self, offset: FixedOffset) -> Self {
        self.config.reference_offset = offset;
        self
    }

    /// Set the HTTP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Parses a UTC offset such as `+05:30`, `-0800`, `+02`, `Z` or `UTC`.
pub fn parse_offset(s: &str) -> std::result::Result<FixedOffset, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(format!("offset '{}' must start with '+' or '-'", s)),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid offset '{}'", s));
    }

    let (hours, minutes) = match digits.len() {
        2 => (&digits[..2], "0"),
        4 => (&digits[..2], &digits[2..]),
        _ => return Err(format!("invalid offset '{}'", s)),
    };

    let hours: i32 = hours.parse().map_err(|_| format!("invalid offset '{}'", s))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| format!("invalid offset '{}'", s))?;
    if hours > 23 || minutes > 59 {
        return Err(format!("offset '{}' out of range", s));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("offset '{}' out of range", s))
}
