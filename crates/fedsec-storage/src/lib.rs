//! # fedsec-storage
//!
//! Storage abstractions used by the fedsec security layer.
//!
//! ## Collaborators
//!
//! - [`StorageService`] - Key-value records with per-record expiration,
//!   namespaced by a context label, with an atomic consuming read
//! - [`ReplayCache`] - Self-expiring record of seen message identifiers
//! - [`Clock`] - Shared notion of "now" for expiration decisions
//!
//! ## Implementations
//!
//! - [`MemoryStorageService`] - Process-local store on a concurrent map,
//!   sweeping expired records as it is written to
//! - [`MemoryReplayCache`] - Process-local replay cache
//! - [`SystemClock`] / [`ManualClock`] - Wall clock and manually driven clock
//!
//! ## Example
//!
//! ```ignore
//! use fedsec_storage::{MemoryStorageService, StorageService};
//! use chrono::{Duration, Utc};
//!
//! async fn remember(store: &MemoryStorageService) -> fedsec_storage::StorageResult<()> {
//!     store.create("sessions", "abc", "payload", Utc::now() + Duration::minutes(5)).await
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod clock;
pub mod error;
pub mod memory;
pub mod provider;
pub mod replay;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryStorageService, DEFAULT_PURGE_INTERVAL_SECS};
pub use provider::{StorageService, StoredRecord};
pub use replay::{MemoryReplayCache, ReplayCache};
