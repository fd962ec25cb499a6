//! Storage Module
//!
//! The key-value capability the cache is built on, plus an in-memory backend.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;

pub use memory::MemoryStorage;

// == Storage Capability ==
/// Minimal string key-value store.
///
/// Backends may be local or remote; every call is awaited by the engine.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns the record stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous record.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Removes the record under `key`; true if one existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        (**self).delete(key).await
    }
}
