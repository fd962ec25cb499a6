//! KV LRU - A least-recently-used cache over an external key-value store
//!
//! The recency list is kept as linked records in any store that offers
//! get/set/delete by key, bounded by entry count and optionally by
//! cumulative record size.

pub mod cache;
pub mod config;
pub mod error;
pub mod memo;
pub mod storage;

pub use cache::{CacheDump, CacheStats, Direction, EntryCursor, LruCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result, StorageError};
pub use memo::{MemoCache, MemoHooks, MemoizeBuilder, Memoized, TracingHooks};
pub use storage::{MemoryStorage, Storage};
