//! Configuration Module
//!
//! Handles loading, building and validating cache configuration.

use std::env;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of live entries
    pub capacity: usize,
    /// Maximum cumulative estimated record size, None = byte policy disabled
    pub byte_capacity: Option<usize>,
    /// Prefix for every record this cache writes to storage
    pub namespace: String,
}

impl CacheConfig {
    /// Creates a config with the given entry capacity and no byte capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Enables the byte-size eviction policy.
    pub fn with_byte_capacity(mut self, byte_capacity: usize) -> Self {
        self.byte_capacity = Some(byte_capacity);
        self
    }

    /// Sets the storage key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LRU_CAPACITY` - Maximum live entries (default: 1000)
    /// - `LRU_BYTE_CAPACITY` - Byte capacity (default: unset)
    /// - `LRU_NAMESPACE` - Storage key namespace (default: "lru")
    pub fn from_env() -> Self {
        Self::from_env_with_capacity(Self::default().capacity)
    }

    /// Same as [`CacheConfig::from_env`], but falls back to
    /// `default_capacity` when `LRU_CAPACITY` is unset or unparsable.
    pub fn from_env_with_capacity(default_capacity: usize) -> Self {
        let defaults = Self::default();
        Self {
            capacity: env::var("LRU_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_capacity),
            byte_capacity: env::var("LRU_BYTE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok()),
            namespace: env::var("LRU_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.namespace),
        }
    }

    /// Checks that every option is usable.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfiguration(
                "capacity must be a positive integer".to_string(),
            ));
        }
        if self.byte_capacity == Some(0) {
            return Err(CacheError::InvalidConfiguration(
                "byte_capacity must be a positive integer when set".to_string(),
            ));
        }
        if self.namespace.is_empty() || self.namespace.contains(':') {
            return Err(CacheError::InvalidConfiguration(format!(
                "namespace {:?} must be non-empty and must not contain ':'",
                self.namespace
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            byte_capacity: None,
            namespace: "lru".to_string(),
        }
    }
}
