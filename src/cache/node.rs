//! Node Codec Module
//!
//! A cached value plus the keys of its two neighbors in the recency list,
//! and the string form it is stored as.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

/// Encoded length of JSON `null`, the marker for an absent reference.
const NULL_WIDTH: usize = 4;

// == Node ==
/// One entry in the externalized recency list.
///
/// Neighbors are referenced by key and must be looked up in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<V> {
    /// User key, never changes
    pub key: String,
    /// Cached payload
    pub value: V,
    /// Neighbor toward the MRU end, None for the MRU node
    pub more_recent: Option<String>,
    /// Neighbor toward the LRU end, None for the LRU node
    pub less_recent: Option<String>,
}

impl<V> Node<V> {
    // == Constructor ==
    /// Creates an unlinked node.
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            more_recent: None,
            less_recent: None,
        }
    }
}

/// Borrowed mirror of [`Node`] with the same encoded field layout.
#[derive(Serialize)]
struct NodeView<'a, V> {
    key: &'a str,
    value: &'a V,
    more_recent: Option<&'a str>,
    less_recent: Option<&'a str>,
}

// == Encode ==
/// Serializes a node to its stored JSON form.
pub fn encode<V: Serialize>(node: &Node<V>) -> Result<String> {
    Ok(serde_json::to_string(node)?)
}

// == Decode ==
/// Parses a stored record back into a node.
///
/// `record_key` is only used to report where a corrupt record was found.
pub fn decode<V: DeserializeOwned>(record_key: &str, raw: &str) -> Result<Node<V>> {
    serde_json::from_str(raw).map_err(|e| CacheError::corrupt(record_key, e))
}

// == Estimate Size ==
/// Estimated stored size of a node in bytes.
///
/// Both references are counted as present at `MAX_KEY_LENGTH` width,
/// whatever their current state, so the estimate does not change when
/// the node moves.
pub fn estimate_size<V: Serialize>(node: &Node<V>) -> Result<usize> {
    let unlinked = NodeView {
        key: &node.key,
        value: &node.value,
        more_recent: None,
        less_recent: None,
    };
    let base = serde_json::to_string(&unlinked)?.len();
    // a quoted reference replaces each null
    Ok(base - 2 * NULL_WIDTH + 2 * (MAX_KEY_LENGTH + 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(key: &str, more: Option<&str>, less: Option<&str>) -> Node<String> {
        Node {
            key: key.to_string(),
            value: format!("value_{}", key),
            more_recent: more.map(String::from),
            less_recent: less.map(String::from),
        }
    }

    #[test]
    fn test_node_new_is_unlinked() {
        let node = Node::new("k", 7u32);
        assert_eq!(node.key, "k");
        assert_eq!(node.value, 7);
        assert!(node.more_recent.is_none());
        assert!(node.less_recent.is_none());
    }

    #[test]
    fn test_decode_inverts_encode() {
        for node in [
            linked("a", None, None),
            linked("b", Some("a"), Some("c")),
            linked("c", Some("b"), None),
        ] {
            let raw = encode(&node).unwrap();
            let decoded: Node<String> = decode("lru:node:x", &raw).unwrap();
            assert_eq!(decoded, node);
        }
    }

    #[test]
    fn test_absent_reference_is_not_a_string() {
        let raw = encode(&linked("a", None, Some("null"))).unwrap();
        assert!(raw.contains(r#""more_recent":null"#));
        assert!(raw.contains(r#""less_recent":"null""#));

        let decoded: Node<String> = decode("k", &raw).unwrap();
        assert_eq!(decoded.more_recent, None);
        assert_eq!(decoded.less_recent, Some("null".to_string()));
    }

    #[test]
    fn test_decode_garbage_is_corrupt_record() {
        let result: Result<Node<String>> = decode("lru:node:a", "{not json");
        match result {
            Err(CacheError::CorruptRecord { key, .. }) => assert_eq!(key, "lru:node:a"),
            other => panic!("expected CorruptRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_wrong_shape_is_corrupt_record() {
        let result: Result<Node<u64>> = decode("k", r#"{"key":"a","value":"text"}"#);
        assert!(matches!(result, Err(CacheError::CorruptRecord { .. })));
    }

    #[test]
    fn test_estimate_ignores_links() {
        let alone = estimate_size(&linked("a", None, None)).unwrap();
        let middle = estimate_size(&linked("a", Some("bbbbbbbb"), Some("c"))).unwrap();
        let tail = estimate_size(&linked("a", Some("b"), None)).unwrap();

        assert_eq!(alone, middle);
        assert_eq!(alone, tail);
    }

    #[test]
    fn test_estimate_covers_full_width_references() {
        let wide = "k".repeat(MAX_KEY_LENGTH);
        let node = linked("a", Some(&wide), Some(&wide));
        let encoded = encode(&node).unwrap().len();
        assert_eq!(estimate_size(&node).unwrap(), encoded);
    }

    #[test]
    fn test_estimate_grows_with_value() {
        let small = Node::new("a", "x".to_string());
        let large = Node::new("a", "x".repeat(100));
        assert_eq!(
            estimate_size(&large).unwrap() - estimate_size(&small).unwrap(),
            99
        );
    }
}
