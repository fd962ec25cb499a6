//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Storage Error Enum ==
/// Failure reported by a storage backend.
///
/// The engine never retries or wraps these beyond [`CacheError::Storage`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend could not be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected or failed the operation
    #[error("Storage backend error: {0}")]
    Backend(String),
}

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A stored record could not be decoded
    #[error("Corrupt record at {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    /// A neighbor reference points at a key with no record
    #[error("Broken link: no record for key {key}")]
    BrokenLink { key: String },

    /// A value could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error raised by the storage capability, passed through as-is
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CacheError {
    pub(crate) fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        CacheError::CorruptRecord {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
