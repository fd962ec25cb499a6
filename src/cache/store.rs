//! Cache Store Module
//!
//! The LRU engine: a doubly linked recency list whose nodes are records in
//! an external key-value store, bounded by entry count and optionally by
//! cumulative estimated byte size.
//!
//! # Consistency
//! Each operation is a sequence of single-key storage writes with no
//! transaction around them. If an operation is dropped or the process dies
//! between two writes, anchors and links can disagree until a higher layer
//! rebuilds them. The engine never tries to repair such a state; reads that
//! hit a dangling reference fail with [`CacheError::BrokenLink`].

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::anchors::AnchorTracker;
use crate::cache::iter::{Direction, EntryCursor};
use crate::cache::node::{self, Node};
use crate::cache::{CacheStats, MAX_KEY_LENGTH};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::storage::{MemoryStorage, Storage};

// == Cache Dump ==
/// Diagnostic snapshot of the recency list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheDump {
    pub most_recent: Option<String>,
    pub least_recent: Option<String>,
    /// Keys from most to least recently used
    pub keys: Vec<String>,
}

// == LRU Cache ==
/// LRU cache over a [`Storage`] backend.
///
/// Operations take `&mut self`: one caller drives the cache, one awaited
/// operation at a time.
#[derive(Debug)]
pub struct LruCache<V, S = MemoryStorage> {
    storage: S,
    anchors: AnchorTracker<S>,
    config: CacheConfig,
    stats: CacheStats,
    _value: PhantomData<fn() -> V>,
}

impl<V, S> LruCache<V, S>
where
    V: Serialize + DeserializeOwned,
    S: Storage + Clone,
{
    // == Constructor ==
    /// Creates a cache over `storage`.
    ///
    /// Fails with `InvalidConfiguration` if the config does not validate.
    /// Existing records under the configured namespace are adopted as-is.
    pub fn new(storage: S, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let anchors = AnchorTracker::new(storage.clone(), &config.namespace);
        Ok(Self {
            storage,
            anchors,
            config,
            stats: CacheStats::new(),
            _value: PhantomData,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Get ==
    /// Returns the value for `key` and makes it the most recently used entry.
    pub async fn get(&mut self, key: &str) -> Result<Option<V>> {
        let Some(mut node) = self.load_node(key).await? else {
            self.stats.record_miss();
            return Ok(None);
        };
        self.stats.record_hit();
        self.promote(&mut node).await?;
        Ok(Some(node.value))
    }

    // == Set ==
    /// Stores `value` under `key` as the most recently used entry.
    ///
    /// Overwriting an existing key counts as a use and never evicts.
    /// Inserting a new key may evict least recently used entries, first
    /// for the byte capacity and then for the entry capacity.
    ///
    /// The byte bound (estimate at most byte capacity or the size of the
    /// inserted node) is enforced on insertion only. Overwrites with larger
    /// values grow the estimate past it until the next insertion.
    pub async fn set(&mut self, key: &str, value: V) -> Result<()> {
        validate_key(key)?;

        match self.load_node(key).await? {
            Some(node) => self.replace(node, value).await,
            None => self.insert(Node::new(key, value)).await,
        }
    }

    // == Peek ==
    /// Returns the value for `key` without touching recency or stats.
    pub async fn peek(&self, key: &str) -> Result<Option<V>> {
        Ok(self.load_node(key).await?.map(|node| node.value))
    }

    // == Contains ==
    pub async fn contains(&self, key: &str) -> Result<bool> {
        let record_key = self.anchors.node_key(key);
        Ok(self.storage.get(&record_key).await?.is_some())
    }

    // == Remove ==
    /// Removes `key` from the cache. Returns false if it was not present.
    pub async fn remove(&mut self, key: &str) -> Result<bool> {
        let Some(mut node) = self.load_node(key).await? else {
            return Ok(false);
        };
        let size = self.tracked_size(&node)?;

        self.unlink(&mut node).await?;
        self.storage.delete(&self.anchors.node_key(key)).await?;

        let count = self.anchors.count().await?.saturating_sub(1);
        self.anchors.set_count(count).await?;
        if self.bytes_tracked() {
            let bytes = self.anchors.byte_estimate().await?.saturating_sub(size);
            self.anchors.set_byte_estimate(bytes).await?;
        }

        debug!(key, count, "removed node");
        Ok(true)
    }

    // == Length ==
    /// Live entry count as recorded in storage.
    pub async fn len(&self) -> Result<usize> {
        self.anchors.count().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Cumulative estimated size of live entries; 0 when no byte capacity is set.
    pub async fn byte_estimate(&self) -> Result<usize> {
        self.anchors.byte_estimate().await
    }

    // == Stats ==
    /// Returns counters for this instance with the current entry count.
    pub async fn stats(&self) -> Result<CacheStats> {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.len().await?);
        Ok(stats)
    }

    // == Iteration ==
    /// Cursor over entries from most to least recently used.
    pub fn entries_from_most_recent(&self) -> EntryCursor<'_, V, S> {
        EntryCursor::new(self, Direction::FromMostRecent)
    }

    /// Cursor over entries from least to most recently used.
    pub fn entries_from_least_recent(&self) -> EntryCursor<'_, V, S> {
        EntryCursor::new(self, Direction::FromLeastRecent)
    }

    // == Dump ==
    /// Reports both anchors and the full key order. For debugging and tests.
    pub async fn dump(&self) -> Result<CacheDump> {
        Ok(CacheDump {
            most_recent: self.anchors.most_recent().await?,
            least_recent: self.anchors.least_recent().await?,
            keys: self.entries_from_most_recent().collect_keys().await?,
        })
    }

    pub(crate) fn anchors(&self) -> &AnchorTracker<S> {
        &self.anchors
    }

    // == Node Access ==
    /// Loads the node for `key`, None if no record exists.
    pub(crate) async fn load_node(&self, key: &str) -> Result<Option<Node<V>>> {
        let record_key = self.anchors.node_key(key);
        let Some(raw) = self.storage.get(&record_key).await? else {
            return Ok(None);
        };
        let node: Node<V> = node::decode(&record_key, &raw)?;
        if node.key != key {
            return Err(CacheError::corrupt(
                record_key,
                format!("record holds key {:?}", node.key),
            ));
        }
        Ok(Some(node))
    }

    /// Loads a node that a link or anchor points at.
    async fn linked_node(&self, key: &str) -> Result<Node<V>> {
        self.load_node(key)
            .await?
            .ok_or_else(|| CacheError::BrokenLink {
                key: key.to_string(),
            })
    }

    async fn store_node(&self, node: &Node<V>) -> Result<()> {
        let raw = node::encode(node)?;
        self.storage.set(&self.anchors.node_key(&node.key), raw).await?;
        Ok(())
    }

    // == Replace ==
    async fn replace(&mut self, mut node: Node<V>, value: V) -> Result<()> {
        let old_size = self.tracked_size(&node)?;
        node.value = value;
        let new_size = self.tracked_size(&node)?;

        self.store_node(&node).await?;
        if self.bytes_tracked() && old_size != new_size {
            let bytes = self.anchors.byte_estimate().await?;
            self.anchors
                .set_byte_estimate((bytes + new_size).saturating_sub(old_size))
                .await?;
        }

        self.promote(&mut node).await
    }

    // == Insert ==
    async fn insert(&mut self, mut node: Node<V>) -> Result<()> {
        let mut count = self.anchors.count().await?;
        let size = self.tracked_size(&node)?;

        if count == 0 {
            self.store_node(&node).await?;
            self.anchors.set_most_recent(Some(&node.key)).await?;
            self.anchors.set_least_recent(Some(&node.key)).await?;
            self.anchors.set_count(1).await?;
            if self.bytes_tracked() {
                self.anchors.set_byte_estimate(size).await?;
            }
            debug!(key = %node.key, count = 1, "inserted node into empty cache");
            return Ok(());
        }

        let mut bytes = 0;
        if let Some(byte_capacity) = self.config.byte_capacity {
            bytes = self.anchors.byte_estimate().await?;
            let (freed_count, freed_bytes) =
                self.evict_for_bytes(byte_capacity, bytes + size).await?;
            if freed_count > 0 {
                count = count.saturating_sub(freed_count);
                bytes = bytes.saturating_sub(freed_bytes);
                self.anchors.set_count(count).await?;
                self.anchors.set_byte_estimate(bytes).await?;
            }
        }

        let head = self.anchors.most_recent().await?;
        self.push_front(&mut node, head).await?;
        count += 1;
        self.anchors.set_count(count).await?;
        if self.bytes_tracked() {
            bytes += size;
            self.anchors.set_byte_estimate(bytes).await?;
        }
        debug!(key = %node.key, count, "inserted node");

        if count > self.config.capacity {
            if let Some(evicted) = self.evict_least_recent().await? {
                count -= 1;
                self.anchors.set_count(count).await?;
                if self.bytes_tracked() {
                    bytes = bytes.saturating_sub(self.tracked_size(&evicted)?);
                    self.anchors.set_byte_estimate(bytes).await?;
                }
            }
        }
        Ok(())
    }

    /// Evicts until `needed` minus the freed bytes fits in `byte_capacity`
    /// or the cache is empty. Returns (freed count, freed bytes).
    async fn evict_for_bytes(
        &mut self,
        byte_capacity: usize,
        needed: usize,
    ) -> Result<(usize, usize)> {
        let mut freed_count = 0;
        let mut freed_bytes = 0;
        while needed.saturating_sub(freed_bytes) > byte_capacity {
            match self.evict_least_recent().await? {
                Some(evicted) => {
                    freed_count += 1;
                    freed_bytes += node::estimate_size(&evicted)?;
                }
                None => break,
            }
        }
        Ok((freed_count, freed_bytes))
    }

    // == Evict ==
    /// Removes the current LRU node and returns it.
    ///
    /// Updates both anchors but leaves count and byte estimate to the caller.
    async fn evict_least_recent(&mut self) -> Result<Option<Node<V>>> {
        let Some(lru_key) = self.anchors.least_recent().await? else {
            return Ok(None);
        };
        let evicted = self.linked_node(&lru_key).await?;

        match &evicted.more_recent {
            Some(next_key) => {
                let mut next = self.linked_node(next_key).await?;
                next.less_recent = None;
                self.store_node(&next).await?;
                self.anchors.set_least_recent(Some(next_key)).await?;
            }
            None => {
                self.anchors.set_most_recent(None).await?;
                self.anchors.set_least_recent(None).await?;
            }
        }
        self.storage.delete(&self.anchors.node_key(&lru_key)).await?;

        self.stats.record_eviction();
        debug!(key = %lru_key, "evicted least recently used node");
        Ok(Some(evicted))
    }

    // == Relinking ==
    /// Moves an existing node to the MRU position.
    async fn promote(&mut self, node: &mut Node<V>) -> Result<()> {
        let head = self.anchors.most_recent().await?;
        match head.as_deref() {
            Some(head_key) if head_key == node.key => return Ok(()),
            Some(_) => {}
            None => {
                return Err(CacheError::corrupt(
                    self.anchors.reserved_keys()[0],
                    format!("missing while node {:?} exists", node.key),
                ))
            }
        }

        self.unlink(node).await?;
        self.push_front(node, head).await?;
        debug!(key = %node.key, "promoted node");
        Ok(())
    }

    /// Joins a node's neighbors to each other and moves any anchor that
    /// pointed at it. Clears the node's own links but does not write it.
    async fn unlink(&self, node: &mut Node<V>) -> Result<()> {
        let more = node.more_recent.take();
        let less = node.less_recent.take();

        match &more {
            Some(more_key) => {
                let mut neighbor = self.linked_node(more_key).await?;
                neighbor.less_recent = less.clone();
                self.store_node(&neighbor).await?;
            }
            None => self.anchors.set_most_recent(less.as_deref()).await?,
        }

        match &less {
            Some(less_key) => {
                let mut neighbor = self.linked_node(less_key).await?;
                neighbor.more_recent = more.clone();
                self.store_node(&neighbor).await?;
            }
            None => self.anchors.set_least_recent(more.as_deref()).await?,
        }
        Ok(())
    }

    /// Writes `node` in front of `head` and points the MRU anchor at it.
    async fn push_front(&self, node: &mut Node<V>, head: Option<String>) -> Result<()> {
        node.more_recent = None;
        node.less_recent = head;

        match &node.less_recent {
            Some(head_key) => {
                // re-read: unlink may have rewritten the old head
                let mut old_head = self.linked_node(head_key).await?;
                old_head.more_recent = Some(node.key.clone());
                self.store_node(&old_head).await?;
            }
            None => self.anchors.set_least_recent(Some(&node.key)).await?,
        }

        self.store_node(node).await?;
        self.anchors.set_most_recent(Some(&node.key)).await
    }

    // == Size Accounting ==
    fn bytes_tracked(&self) -> bool {
        self.config.byte_capacity.is_some()
    }

    /// Size estimate when the byte policy is on, 0 otherwise.
    fn tracked_size(&self, node: &Node<V>) -> Result<usize> {
        if self.bytes_tracked() {
            node::estimate_size(node)
        } else {
            Ok(0)
        }
    }
}

// == Key Validation ==
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{assert_consistent, keys_from_most_recent};

    fn cache(capacity: usize) -> (MemoryStorage, LruCache<String, MemoryStorage>) {
        let storage = MemoryStorage::new();
        let cache = LruCache::new(storage.clone(), CacheConfig::new(capacity)).unwrap();
        (storage, cache)
    }

    async fn set_all(cache: &mut LruCache<String, MemoryStorage>, pairs: &[(&str, &str)]) {
        for (key, value) in pairs {
            cache.set(key, value.to_string()).await.unwrap();
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = LruCache::<String, _>::new(MemoryStorage::new(), CacheConfig::new(0));
        assert!(matches!(result, Err(CacheError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_new_cache_is_empty() {
        let (storage, cache) = cache(3);
        assert!(cache.is_empty().await.unwrap());
        assert_eq!(
            cache.dump().await.unwrap(),
            CacheDump {
                most_recent: None,
                least_recent: None,
                keys: vec![],
            }
        );
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_three_scenario() {
        let (_, mut cache) = cache(3);

        set_all(&mut cache, &[("1", "a"), ("2", "b"), ("3", "c")]).await;
        assert_eq!(keys_from_most_recent(&cache).await, ["3", "2", "1"]);

        cache.set("4", "d".to_string()).await.unwrap();
        assert_eq!(keys_from_most_recent(&cache).await, ["4", "3", "2"]);
        assert_eq!(cache.get("1").await.unwrap(), None);

        assert_eq!(cache.get("2").await.unwrap(), Some("b".to_string()));
        assert_eq!(keys_from_most_recent(&cache).await, ["2", "4", "3"]);

        cache.set("5", "e".to_string()).await.unwrap();
        assert_eq!(keys_from_most_recent(&cache).await, ["5", "2", "4"]);

        let dump = cache.dump().await.unwrap();
        assert_eq!(dump.most_recent.as_deref(), Some("5"));
        assert_eq!(dump.least_recent.as_deref(), Some("4"));
        assert_eq!(cache.len().await.unwrap(), 3);
        assert_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_get_absent_changes_nothing() {
        let (storage, mut cache) = cache(3);
        set_all(&mut cache, &[("a", "1"), ("b", "2")]).await;
        let before = storage.keys().await;
        let dump = cache.dump().await.unwrap();

        assert_eq!(cache.get("missing").await.unwrap(), None);

        assert_eq!(cache.dump().await.unwrap(), dump);
        assert_eq!(storage.keys().await, before);
        assert_eq!(cache.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_on_mru_keeps_order() {
        let (_, mut cache) = cache(3);
        set_all(&mut cache, &[("a", "1"), ("b", "2")]).await;

        assert_eq!(cache.get("b").await.unwrap(), Some("2".to_string()));
        assert_eq!(keys_from_most_recent(&cache).await, ["b", "a"]);
    }

    #[tokio::test]
    async fn test_get_promotes_middle_and_tail() {
        let (_, mut cache) = cache(5);
        set_all(&mut cache, &[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]).await;

        cache.get("c").await.unwrap();
        assert_eq!(keys_from_most_recent(&cache).await, ["c", "d", "b", "a"]);
        assert_consistent(&cache).await;

        cache.get("a").await.unwrap();
        assert_eq!(keys_from_most_recent(&cache).await, ["a", "c", "d", "b"]);
        assert_eq!(cache.dump().await.unwrap().least_recent.as_deref(), Some("b"));
        assert_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_promote_tail_of_two() {
        let (_, mut cache) = cache(2);
        set_all(&mut cache, &[("a", "1"), ("b", "2")]).await;

        cache.get("a").await.unwrap();
        assert_eq!(keys_from_most_recent(&cache).await, ["a", "b"]);
        assert_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_set_existing_overwrites_and_promotes() {
        let (_, mut cache) = cache(3);
        set_all(&mut cache, &[("a", "1"), ("b", "2"), ("c", "3")]).await;

        cache.set("a", "updated".to_string()).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 3);
        assert_eq!(keys_from_most_recent(&cache).await, ["a", "c", "b"]);
        assert_eq!(cache.peek("a").await.unwrap(), Some("updated".to_string()));
        assert_consistent(&cache).await;

        // b is now the eviction candidate
        cache.set("d", "4".to_string()).await.unwrap();
        assert!(!cache.contains("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_capacity_one() {
        let (storage, mut cache) = cache(1);
        set_all(&mut cache, &[("a", "1"), ("b", "2")]).await;

        assert_eq!(keys_from_most_recent(&cache).await, ["b"]);
        assert_eq!(cache.len().await.unwrap(), 1);
        assert!(!storage.keys().await.contains(&"lru:node:a".to_string()));
        assert_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_peek_does_not_promote_or_count() {
        let (_, mut cache) = cache(3);
        set_all(&mut cache, &[("a", "1"), ("b", "2")]).await;

        assert_eq!(cache.peek("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(keys_from_most_recent(&cache).await, ["b", "a"]);
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[tokio::test]
    async fn test_remove_head_middle_tail_and_last() {
        let (storage, mut cache) = cache(5);
        set_all(&mut cache, &[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]).await;

        assert!(cache.remove("b").await.unwrap());
        assert_eq!(keys_from_most_recent(&cache).await, ["d", "c", "a"]);
        assert!(cache.remove("d").await.unwrap());
        assert!(cache.remove("a").await.unwrap());
        assert_eq!(keys_from_most_recent(&cache).await, ["c"]);
        assert_consistent(&cache).await;

        assert!(cache.remove("c").await.unwrap());
        assert!(!cache.remove("c").await.unwrap());
        assert!(cache.is_empty().await.unwrap());
        assert_eq!(storage.keys().await, vec!["lru:meta:count".to_string()]);

        cache.set("e", "5".to_string()).await.unwrap();
        assert_eq!(keys_from_most_recent(&cache).await, ["e"]);
    }

    #[tokio::test]
    async fn test_stats_track_hits_misses_evictions() {
        let (_, mut cache) = cache(2);
        set_all(&mut cache, &[("a", "1"), ("b", "2"), ("c", "3")]).await;
        cache.get("c").await.unwrap();
        cache.get("a").await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.total_entries, 2);
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected_before_storage() {
        let (storage, mut cache) = cache(3);

        let empty = cache.set("", "v".to_string()).await;
        assert!(matches!(empty, Err(CacheError::InvalidKey(_))));

        let long = cache.set(&"x".repeat(MAX_KEY_LENGTH + 1), "v".to_string()).await;
        assert!(matches!(long, Err(CacheError::InvalidKey(_))));

        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_byte_capacity_large_value_then_evicted() {
        let storage = MemoryStorage::new();
        let config = CacheConfig::new(100).with_byte_capacity(600);
        let mut cache: LruCache<String, _> = LruCache::new(storage, config).unwrap();

        let large = "x".repeat(1000);
        cache.set("big", large.clone()).await.unwrap();
        assert_eq!(keys_from_most_recent(&cache).await, ["big"]);
        assert_eq!(cache.peek("big").await.unwrap(), Some(large));
        assert_consistent(&cache).await;

        cache.set("small", "y".to_string()).await.unwrap();
        assert_eq!(keys_from_most_recent(&cache).await, ["small"]);
        assert_eq!(cache.len().await.unwrap(), 1);
        assert_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_byte_capacity_evicts_oldest_until_fit() {
        let unit = node::estimate_size(&Node::new("k0", "v".repeat(10))).unwrap();
        let config = CacheConfig::new(100).with_byte_capacity(unit * 3);
        let mut cache: LruCache<String, _> = LruCache::new(MemoryStorage::new(), config).unwrap();

        for i in 0..5 {
            cache.set(&format!("k{}", i), "v".repeat(10)).await.unwrap();
            assert!(cache.byte_estimate().await.unwrap() <= unit * 3);
        }

        assert_eq!(keys_from_most_recent(&cache).await, ["k4", "k3", "k2"]);
        assert_eq!(cache.byte_estimate().await.unwrap(), unit * 3);
        assert_eq!(cache.stats().await.unwrap().evictions, 2);
        assert_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_overwrite_adjusts_byte_estimate() {
        let config = CacheConfig::new(10).with_byte_capacity(100_000);
        let mut cache: LruCache<String, _> = LruCache::new(MemoryStorage::new(), config).unwrap();

        cache.set("a", "short".to_string()).await.unwrap();
        cache.set("b", "short".to_string()).await.unwrap();
        cache.set("a", "a much longer value".to_string()).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 2);
        assert_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_growing_overwrite_exceeds_bound_until_next_insert() {
        let unit = node::estimate_size(&Node::new("a", "v".to_string())).unwrap();
        let config = CacheConfig::new(10).with_byte_capacity(unit * 2);
        let mut cache: LruCache<String, _> = LruCache::new(MemoryStorage::new(), config).unwrap();

        cache.set("a", "v".to_string()).await.unwrap();
        cache.set("b", "v".to_string()).await.unwrap();
        cache.set("a", "v".repeat(500)).await.unwrap();

        // overwrite keeps both entries even though the estimate is over the limit
        assert_eq!(cache.len().await.unwrap(), 2);
        assert!(cache.byte_estimate().await.unwrap() > unit * 2);
        assert_eq!(cache.stats().await.unwrap().evictions, 0);
        assert_consistent(&cache).await;

        // the next insertion evicts until the new node fits
        cache.set("c", "v".to_string()).await.unwrap();
        assert!(cache.byte_estimate().await.unwrap() <= unit * 2);
        assert_eq!(keys_from_most_recent(&cache).await, ["c"]);
        assert_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_no_byte_accounting_without_byte_capacity() {
        let (storage, mut cache) = cache(3);
        set_all(&mut cache, &[("a", "1"), ("b", "2")]).await;

        assert_eq!(cache.byte_estimate().await.unwrap(), 0);
        assert!(!storage.keys().await.contains(&"lru:meta:bytes".to_string()));
    }

    #[tokio::test]
    async fn test_broken_link_is_surfaced() {
        let (storage, mut cache) = cache(5);
        set_all(&mut cache, &[("a", "1"), ("b", "2"), ("c", "3")]).await;

        // b's neighbors are a and c; drop a behind the cache's back
        storage.delete("lru:node:a").await.unwrap();

        match cache.get("b").await {
            Err(CacheError::BrokenLink { key }) => assert_eq!(key, "a"),
            other => panic!("expected BrokenLink, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_corrupt_node_is_surfaced() {
        let (storage, mut cache) = cache(5);
        set_all(&mut cache, &[("a", "1")]).await;
        storage.set("lru:node:a", "garbage".to_string()).await.unwrap();

        let result = cache.get("a").await;
        assert!(matches!(result, Err(CacheError::CorruptRecord { .. })));
    }

    #[tokio::test]
    async fn test_record_under_wrong_key_is_corrupt() {
        let (storage, mut cache) = cache(5);
        set_all(&mut cache, &[("a", "1")]).await;
        let raw = storage.get("lru:node:a").await.unwrap().unwrap();
        storage.set("lru:node:z", raw).await.unwrap();

        assert!(matches!(
            cache.peek("z").await,
            Err(CacheError::CorruptRecord { .. })
        ));
    }

    #[tokio::test]
    async fn test_cache_adopts_existing_records() {
        let storage = MemoryStorage::new();
        {
            let mut first: LruCache<String, _> =
                LruCache::new(storage.clone(), CacheConfig::new(3)).unwrap();
            first.set("a", "1".to_string()).await.unwrap();
            first.set("b", "2".to_string()).await.unwrap();
        }

        let mut second: LruCache<String, _> =
            LruCache::new(storage, CacheConfig::new(3)).unwrap();
        assert_eq!(second.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(keys_from_most_recent(&second).await, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_structured_values() {
        #[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
        struct Profile {
            id: u32,
            tags: Vec<String>,
        }

        let mut cache: LruCache<Profile, _> =
            LruCache::new(MemoryStorage::new(), CacheConfig::new(2)).unwrap();
        let profile = Profile {
            id: 7,
            tags: vec!["admin".to_string()],
        };
        cache.set("p7", profile.clone()).await.unwrap();
        assert_eq!(cache.get("p7").await.unwrap(), Some(profile));
    }
}
