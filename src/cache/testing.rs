//! Invariant checks shared by the cache tests.

use crate::cache::node;
use crate::cache::LruCache;
use crate::storage::MemoryStorage;

pub(crate) async fn keys_from_most_recent(cache: &LruCache<String, MemoryStorage>) -> Vec<String> {
    cache.entries_from_most_recent().collect_keys().await.unwrap()
}

/// Asserts that anchors, links, count and byte estimate agree.
pub(crate) async fn assert_consistent(cache: &LruCache<String, MemoryStorage>) {
    let forward = keys_from_most_recent(cache).await;
    let mut backward = cache.entries_from_least_recent().collect_keys().await.unwrap();
    backward.reverse();
    assert_eq!(forward, backward, "forward and backward walks disagree");

    let dump = cache.dump().await.unwrap();
    assert_eq!(dump.most_recent.as_ref(), forward.first());
    assert_eq!(dump.least_recent.as_ref(), forward.last());
    assert_eq!(cache.len().await.unwrap(), forward.len(), "count mismatch");

    for key in &forward {
        assert!(cache.contains(key).await.unwrap());
    }

    if cache.config().byte_capacity.is_some() {
        let mut expected = 0;
        for key in &forward {
            let node = cache.load_node(key).await.unwrap().unwrap();
            expected += node::estimate_size(&node).unwrap();
        }
        assert_eq!(cache.byte_estimate().await.unwrap(), expected, "byte estimate mismatch");
    }
}
