//! Storage service traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;

/// A record held by a [`StorageService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// The stored value.
    pub value: String,
    /// Instant after which the record is no longer readable.
    pub expires: DateTime<Utc>,
}

impl StoredRecord {
    /// Returns true if the record has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// Key-value storage with per-record expiration.
///
/// Records are addressed by a `(context, key)` pair, so independent users can
/// share one physical store without key collisions. Implementations must be
/// thread-safe; in particular [`take`](StorageService::take) must be atomic
/// with respect to concurrent `take`/`read`/`delete` calls on the same key,
/// since single-use consumers depend on it.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates a new record.
    ///
    /// Fails with `StorageError::Duplicate` if an unexpired record already
    /// exists under the same context and key.
    async fn create(
        &self,
        context: &str,
        key: &str,
        value: &str,
        expires: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Reads a record without consuming it.
    ///
    /// Returns `None` if the record doesn't exist or has expired.
    async fn read(&self, context: &str, key: &str) -> StorageResult<Option<StoredRecord>>;

    /// Atomically reads and deletes a record.
    ///
    /// Expired records are removed and reported as `None`.
    async fn take(&self, context: &str, key: &str) -> StorageResult<Option<StoredRecord>>;

    /// Deletes a record.
    ///
    /// Returns `true` if a record was removed.
    async fn delete(&self, context: &str, key: &str) -> StorageResult<bool>;

    /// Removes every expired record in a context.
    ///
    /// Returns the number of records removed.
    async fn purge_expired(&self, context: &str) -> StorageResult<u64>;
}
