//! Anchor Tracker Module
//!
//! The four scalar records that locate the recency list: MRU key, LRU key,
//! live entry count and cumulative byte estimate.
//!
//! # Key Layout
//! - `{ns}:meta:mru`, `{ns}:meta:lru`, `{ns}:meta:count`, `{ns}:meta:bytes`
//! - node records live under `{ns}:node:{key}`
//!
//! User keys only ever follow the `node:` segment, so no user key can
//! address an anchor record.

use tracing::trace;

use crate::error::{CacheError, Result};
use crate::storage::Storage;

const MRU_SUFFIX: &str = "meta:mru";
const LRU_SUFFIX: &str = "meta:lru";
const COUNT_SUFFIX: &str = "meta:count";
const BYTES_SUFFIX: &str = "meta:bytes";
const NODE_SEGMENT: &str = "node:";

// == Anchor Tracker ==
/// Reads and writes anchor records, one storage round trip per call.
///
/// An absent anchor is stored as an absent record.
#[derive(Debug, Clone)]
pub struct AnchorTracker<S> {
    storage: S,
    mru_key: String,
    lru_key: String,
    count_key: String,
    bytes_key: String,
    node_prefix: String,
}

impl<S: Storage> AnchorTracker<S> {
    // == Constructor ==
    pub fn new(storage: S, namespace: &str) -> Self {
        Self {
            storage,
            mru_key: format!("{}:{}", namespace, MRU_SUFFIX),
            lru_key: format!("{}:{}", namespace, LRU_SUFFIX),
            count_key: format!("{}:{}", namespace, COUNT_SUFFIX),
            bytes_key: format!("{}:{}", namespace, BYTES_SUFFIX),
            node_prefix: format!("{}:{}", namespace, NODE_SEGMENT),
        }
    }

    /// Storage key of the node record for a user key.
    pub fn node_key(&self, key: &str) -> String {
        format!("{}{}", self.node_prefix, key)
    }

    /// The four reserved anchor keys.
    pub fn reserved_keys(&self) -> [&str; 4] {
        [
            &self.mru_key,
            &self.lru_key,
            &self.count_key,
            &self.bytes_key,
        ]
    }

    // == Most Recent ==
    pub async fn most_recent(&self) -> Result<Option<String>> {
        self.read(&self.mru_key).await
    }

    pub async fn set_most_recent(&self, key: Option<&str>) -> Result<()> {
        self.write(&self.mru_key, key.map(str::to_string)).await
    }

    // == Least Recent ==
    pub async fn least_recent(&self) -> Result<Option<String>> {
        self.read(&self.lru_key).await
    }

    pub async fn set_least_recent(&self, key: Option<&str>) -> Result<()> {
        self.write(&self.lru_key, key.map(str::to_string)).await
    }

    // == Count ==
    /// Live entry count, 0 when never written.
    pub async fn count(&self) -> Result<usize> {
        self.read_number(&self.count_key).await
    }

    pub async fn set_count(&self, count: usize) -> Result<()> {
        self.write_number(&self.count_key, count).await
    }

    // == Byte Estimate ==
    /// Cumulative estimated size of live nodes, 0 when never written.
    pub async fn byte_estimate(&self) -> Result<usize> {
        self.read_number(&self.bytes_key).await
    }

    pub async fn set_byte_estimate(&self, bytes: usize) -> Result<()> {
        self.write_number(&self.bytes_key, bytes).await
    }

    // == Helpers ==
    async fn read(&self, record_key: &str) -> Result<Option<String>> {
        let value = self.storage.get(record_key).await?;
        trace!(record = record_key, present = value.is_some(), "anchor read");
        Ok(value)
    }

    async fn write(&self, record_key: &str, value: Option<String>) -> Result<()> {
        trace!(record = record_key, value = ?value, "anchor write");
        match value {
            Some(value) => self.storage.set(record_key, value).await?,
            None => {
                self.storage.delete(record_key).await?;
            }
        }
        Ok(())
    }

    async fn read_number(&self, record_key: &str) -> Result<usize> {
        match self.read(record_key).await? {
            Some(raw) => raw
                .parse()
                .map_err(|e| CacheError::corrupt(record_key, format!("{:?}: {}", raw, e))),
            None => Ok(0),
        }
    }

    async fn write_number(&self, record_key: &str, value: usize) -> Result<()> {
        self.write(record_key, Some(value.to_string())).await
    }
}
