//! Storage error types.

use std::fmt;

/// Storage and replay cache operation errors.
#[derive(Debug)]
pub enum StorageError {
    /// Connection to the storage backend failed.
    Connection(String),
    /// Stored value could not be encoded or decoded.
    Serialization(String),
    /// A record with the same context and key already exists.
    Duplicate {
        /// Storage context of the record.
        context: String,
        /// Key of the record.
        key: String,
    },
    /// The context or key is unusable (empty or too long).
    InvalidKey(String),
    /// Storage operation timed out.
    Timeout,
    /// Internal storage error.
    Internal(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "storage connection error: {msg}"),
            Self::Serialization(msg) => write!(f, "storage serialization error: {msg}"),
            Self::Duplicate { context, key } => {
                write!(f, "record already exists: {context}/{key}")
            }
            Self::InvalidKey(msg) => write!(f, "invalid storage key: {msg}"),
            Self::Timeout => write!(f, "storage operation timed out"),
            Self::Internal(msg) => write!(f, "internal storage error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
