//! In-memory storage service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::{StorageError, StorageResult};
use crate::provider::{StorageService, StoredRecord};

/// Maximum length of a context label.
pub const MAX_CONTEXT_LEN: usize = 255;

/// Maximum length of a record key.
pub const MAX_KEY_LEN: usize = 255;

/// Minimum time between opportunistic sweeps of expired entries, in seconds.
pub const DEFAULT_PURGE_INTERVAL_SECS: u32 = 60;

/// Process-local [`StorageService`] backed by a concurrent hash map.
///
/// Single-key operations lock only the shard owning the key, so `take` is
/// atomic with respect to every other operation on the same record. Expired
/// records in every context are swept by the first `create` after each purge
/// interval.
#[derive(Debug)]
pub struct MemoryStorageService {
    records: DashMap<(String, String), StoredRecord>,
    clock: Arc<dyn Clock>,
    purge_interval: Duration,
    next_purge: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryStorageService {
    /// Creates an empty store using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock::shared())
    }

    /// Creates an empty store using the given clock for expiration.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            clock,
            purge_interval: Duration::seconds(i64::from(DEFAULT_PURGE_INTERVAL_SECS)),
            next_purge: Mutex::new(None),
        }
    }

    /// Sets how often writes sweep out expired records.
    #[must_use]
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Returns the number of records held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // Must not be called while holding a map entry.
    fn purge_if_due(&self, now: DateTime<Utc>) {
        {
            let mut next = self.next_purge.lock();
            if next.is_some_and(|next| now < next) {
                return;
            }
            *next = Some(now + self.purge_interval);
        }

        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        let purged = before.saturating_sub(self.records.len());
        if purged > 0 {
            tracing::debug!(purged, "swept expired records");
        }
    }
}

impl Default for MemoryStorageService {
    fn default() -> Self {
        Self::new()
    }
}

fn record_key(context: &str, key: &str) -> StorageResult<(String, String)> {
    if context.is_empty() || context.len() > MAX_CONTEXT_LEN {
        return Err(StorageError::InvalidKey(format!(
            "context must be 1..={MAX_CONTEXT_LEN} bytes"
        )));
    }
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey(format!(
            "key must be 1..={MAX_KEY_LEN} bytes"
        )));
    }
    Ok((context.to_string(), key.to_string()))
}

#[async_trait]
impl StorageService for MemoryStorageService {
    async fn create(
        &self,
        context: &str,
        key: &str,
        value: &str,
        expires: DateTime<Utc>,
    ) -> StorageResult<()> {
        let now = self.now();
        let key = record_key(context, key)?;
        self.purge_if_due(now);

        let record = StoredRecord {
            value: value.to_string(),
            expires,
        };

        match self.records.entry(key) {
            Entry::Occupied(mut existing) => {
                if !existing.get().is_expired(now) {
                    let (context, key) = existing.key().clone();
                    return Err(StorageError::Duplicate { context, key });
                }
                existing.insert(record);
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
        Ok(())
    }

    async fn read(&self, context: &str, key: &str) -> StorageResult<Option<StoredRecord>> {
        let now = self.now();
        let found = self
            .records
            .get(&record_key(context, key)?)
            .filter(|r| !r.is_expired(now))
            .map(|r| r.value().clone());
        Ok(found)
    }

    async fn take(&self, context: &str, key: &str) -> StorageResult<Option<StoredRecord>> {
        let now = self.now();
        let removed = self.records.remove(&record_key(context, key)?);
        Ok(removed
            .map(|(_, record)| record)
            .filter(|record| !record.is_expired(now)))
    }

    async fn delete(&self, context: &str, key: &str) -> StorageResult<bool> {
        Ok(self.records.remove(&record_key(context, key)?).is_some())
    }

    async fn purge_expired(&self, context: &str) -> StorageResult<u64> {
        let now = self.now();
        let before = self.records.len();
        self.records
            .retain(|(ctx, _), record| ctx != context || !record.is_expired(now));
        let purged = before.saturating_sub(self.records.len());
        if purged > 0 {
            tracing::debug!(context, purged, "purged expired records");
        }
        Ok(purged as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};

    fn store() -> (MemoryStorageService, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        (MemoryStorageService::with_clock(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn create_then_read() {
        let (store, clock) = store();
        let expires = clock.now() + Duration::seconds(60);
        store.create("ctx", "k1", "v1", expires).await.unwrap();

        let record = store.read("ctx", "k1").await.unwrap().unwrap();
        assert_eq!(record.value, "v1");
        assert_eq!(record.expires, expires);

        // Reading does not consume.
        assert!(store.read("ctx", "k1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn contexts_are_isolated() {
        let (store, clock) = store();
        let expires = clock.now() + Duration::seconds(60);
        store.create("a", "k", "from-a", expires).await.unwrap();
        store.create("b", "k", "from-b", expires).await.unwrap();

        assert_eq!(store.read("a", "k").await.unwrap().unwrap().value, "from-a");
        assert_eq!(store.read("b", "k").await.unwrap().unwrap().value, "from-b");
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let (store, clock) = store();
        let expires = clock.now() + Duration::seconds(60);
        store.create("ctx", "k", "v", expires).await.unwrap();

        let err = store.create("ctx", "k", "v2", expires).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn create_replaces_expired_record() {
        let (store, clock) = store();
        store
            .create("ctx", "k", "old", clock.now() + Duration::seconds(1))
            .await
            .unwrap();
        clock.advance_secs(2);

        store
            .create("ctx", "k", "new", clock.now() + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(store.read("ctx", "k").await.unwrap().unwrap().value, "new");
    }

    #[tokio::test]
    async fn take_consumes_once() {
        let (store, clock) = store();
        store
            .create("ctx", "k", "v", clock.now() + Duration::seconds(60))
            .await
            .unwrap();

        assert!(store.take("ctx", "k").await.unwrap().is_some());
        assert!(store.take("ctx", "k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn expired_records_are_invisible_and_removed_by_take() {
        let (store, clock) = store();
        store
            .create("ctx", "k", "v", clock.now() + Duration::seconds(10))
            .await
            .unwrap();
        clock.advance_secs(10);

        assert!(store.read("ctx", "k").await.unwrap().is_none());
        assert_eq!(store.len(), 1);
        assert!(store.take("ctx", "k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn purge_only_touches_expired_records_in_context() {
        let (store, clock) = store();
        let now = clock.now();
        store.create("ctx", "short", "v", now + Duration::seconds(5)).await.unwrap();
        store.create("ctx", "long", "v", now + Duration::seconds(500)).await.unwrap();
        store.create("other", "short", "v", now + Duration::seconds(5)).await.unwrap();
        clock.advance_secs(6);

        assert_eq!(store.purge_expired("ctx").await.unwrap(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn unredeemed_records_do_not_accumulate() {
        let (store, clock) = store();
        let store = store.with_purge_interval(Duration::seconds(30));

        for i in 0..200 {
            let key = format!("k{i}");
            store
                .create("ctx", &key, "v", clock.now() + Duration::seconds(10))
                .await
                .unwrap();
            assert_eq!(store.len(), 1);
            clock.advance_secs(60);
        }
    }

    #[tokio::test]
    async fn sweep_keeps_live_records() {
        let (store, clock) = store();
        let store = store.with_purge_interval(Duration::seconds(1));
        let now = clock.now();
        store.create("ctx", "short", "v", now + Duration::seconds(5)).await.unwrap();
        store.create("other", "long", "v", now + Duration::seconds(500)).await.unwrap();
        clock.advance_secs(10);

        store
            .create("ctx", "next", "v", clock.now() + Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.read("other", "long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn empty_keys_are_rejected() {
        let (store, clock) = store();
        let err = store
            .create("", "k", "v", clock.now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert!(store.read("ctx", "").await.is_err());
    }
}
