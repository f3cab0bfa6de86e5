//! Entry Lifecycle Policy
//!
//! Every entry carries a single `expires_at` timestamp and its state is
//! derived from comparing that timestamp with "now":
//!
//! ```text
//!   expires_at > now   ──>  live        (visible to GET and SCAN)
//!   expires_at <= now  ──>  expired     (row kept, invisible)
//!   expires_at == 0001-01-01T00:00:00Z  soft-deleted (same as expired)
//! ```
//!
//! ## Rules
//!
//! 1. **TTL on write**: a PUT always sets `expires_at = now + ttl`, whatever
//!    the previous state of the row. Reviving an expired or deleted key is legal.
//! 2. **Liveness**: reads keep only rows where `expires_at > now`.
//! 3. **Soft delete**: DELETE rewrites `expires_at` to the sentinel, but only
//!    for a row that is currently live.
//!
//! Timestamps are stored and compared in UTC, so liveness is unaffected by
//! zone or DST changes. The configured reference offset is only applied when
//! rendering an entry back to a client.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{KvError, Result};

/// Seconds from the Unix epoch to 0001-01-01T00:00:00Z.
const SENTINEL_UNIX_SECS: i64 = -62_135_596_800;

/// Source of "now" for the lifecycle rules.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used to simulate expiry.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Starts at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// The timestamp written by a soft delete.
///
/// It lies before any time the TTL rule can produce, so a tombstoned row
/// always fails the liveness predicate.
pub fn soft_delete_sentinel() -> DateTime<Utc> {
    DateTime::from_timestamp(SENTINEL_UNIX_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Liveness predicate against an explicit "now".
#[inline]
pub fn is_live_at(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at > now
}

/// TTL, liveness and soft-delete rules bound to a clock and a display offset.
#[derive(Clone)]
pub struct LifecyclePolicy {
    ttl: TimeDelta,
    offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for LifecyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecyclePolicy")
            .field("ttl_secs", &self.ttl.num_seconds())
            .field("offset", &self.offset)
            .finish()
    }
}

impl LifecyclePolicy {
    /// Creates a policy. A zero or unrepresentable TTL is a configuration error.
    pub fn new(ttl: Duration, offset: FixedOffset, clock: Arc<dyn Clock>) -> Result<Self> {
        if ttl.is_zero() {
            return Err(KvError::Config("ttl must be greater than zero".into()));
        }
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|e| KvError::Config(format!("ttl out of range: {}", e)))?;

        Ok(Self { ttl, offset, clock })
    }

    /// Policy on the wall clock.
    pub fn with_system_clock(ttl: Duration, offset: FixedOffset) -> Result<Self> {
        Self::new(ttl, offset, Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// `expires_at` for a row being written right now.
    pub fn expires_at_for_write(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// `expires_at > now`
    pub fn is_live(&self, expires_at: DateTime<Utc>) -> bool {
        is_live_at(expires_at, self.clock.now())
    }

    /// Renders a stored timestamp in the reference offset.
    pub fn render(&self, ts: DateTime<Utc>) -> DateTime<FixedOffset> {
        ts.with_timezone(&self.offset)
    }
}
