//! Replay detection cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::StorageResult;
use crate::memory::DEFAULT_PURGE_INTERVAL_SECS;

/// Records message identifiers that have been seen.
///
/// Entries are self-expiring: an identifier only has to be remembered for as
/// long as a resubmission could still pass freshness checks, which is why the
/// caller supplies the expiration with every check.
pub trait ReplayCache: Send + Sync {
    /// Checks a value for replay and records it.
    ///
    /// Returns `true` if the value had not been seen (or its previous record
    /// has expired) and is now recorded until `expires`; `false` if it is a
    /// replay.
    fn check(&self, context: &str, value: &str, expires: DateTime<Utc>) -> StorageResult<bool>;
}

/// Process-local [`ReplayCache`].
///
/// Check-and-record happens under a single lock, so two concurrent checks of
/// the same value can never both succeed. Expired entries are dropped by the
/// first check after each purge interval, so the cache holds roughly what
/// arrived within one freshness window.
#[derive(Debug)]
pub struct MemoryReplayCache {
    state: Mutex<ReplayState>,
    clock: Arc<dyn Clock>,
    purge_interval: Duration,
}

#[derive(Debug, Default)]
struct ReplayState {
    seen: HashMap<(String, String), DateTime<Utc>>,
    next_purge: Option<DateTime<Utc>>,
}

impl ReplayState {
    fn purge(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, expires| *expires > now);
        before - self.seen.len()
    }
}

impl MemoryReplayCache {
    /// Creates an empty cache using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock::shared())
    }

    /// Creates an empty cache using the given clock for expiration.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(ReplayState::default()),
            clock,
            purge_interval: Duration::seconds(i64::from(DEFAULT_PURGE_INTERVAL_SECS)),
        }
    }

    /// Sets how often checks sweep out expired entries.
    #[must_use]
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.state.lock().purge(now)
    }

    /// Returns the number of entries held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().seen.len()
    }

    /// Returns true if no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().seen.is_empty()
    }
}

impl Default for MemoryReplayCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayCache for MemoryReplayCache {
    fn check(&self, context: &str, value: &str, expires: DateTime<Utc>) -> StorageResult<bool> {
        let now = self.clock.now();
        let key = (context.to_string(), value.to_string());
        let mut state = self.state.lock();

        if state.next_purge.map_or(true, |next| now >= next) {
            let purged = state.purge(now);
            if purged > 0 {
                tracing::debug!(purged, "purged expired replay cache entries");
            }
            state.next_purge = Some(now + self.purge_interval);
        }

        if let Some(recorded) = state.seen.get(&key) {
            if *recorded > now {
                tracing::debug!(context, value, "replay cache hit");
                return Ok(false);
            }
        }

        state.seen.insert(key, expires);
        Ok(true)
    }
}
