//! Cache Module
//!
//! LRU caching over an external key-value store: node codec, anchor
//! records, the engine and its traversal cursors.

mod anchors;
mod iter;
pub mod node;
mod stats;
mod store;

#[cfg(test)]
mod testing;

// Re-export public types
pub use anchors::AnchorTracker;
pub use iter::{Direction, EntryCursor};
pub use node::Node;
pub use stats::CacheStats;
pub use store::{CacheDump, LruCache};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
