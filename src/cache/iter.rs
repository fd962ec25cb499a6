//! Iteration Module
//!
//! Lazy traversal of the recency list, one node lookup per step.

use std::collections::HashSet;
use std::mem;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::LruCache;
use crate::error::Result;
use crate::storage::Storage;

/// Which end of the list a cursor starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// MRU to LRU, following `less_recent`
    FromMostRecent,
    /// LRU to MRU, following `more_recent`
    FromLeastRecent,
}

#[derive(Debug)]
enum CursorState {
    Unstarted,
    At(String),
    Exhausted,
}

// == Entry Cursor ==
/// Single-pass cursor over `(key, value)` pairs.
///
/// The starting anchor is read on the first call to [`EntryCursor::next`].
/// If storage changes underneath the walk, the cursor ends early when a
/// node has vanished and never yields the same key twice.
#[derive(Debug)]
pub struct EntryCursor<'a, V, S> {
    cache: &'a LruCache<V, S>,
    direction: Direction,
    state: CursorState,
    visited: HashSet<String>,
}

impl<'a, V, S> EntryCursor<'a, V, S>
where
    V: Serialize + DeserializeOwned,
    S: Storage + Clone,
{
    pub(crate) fn new(cache: &'a LruCache<V, S>, direction: Direction) -> Self {
        Self {
            cache,
            direction,
            state: CursorState::Unstarted,
            visited: HashSet::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    // == Advance ==
    /// Returns the next pair, or None once the walk is over.
    ///
    /// Errors end the walk as well.
    pub async fn next(&mut self) -> Result<Option<(String, V)>> {
        let key = match mem::replace(&mut self.state, CursorState::Exhausted) {
            CursorState::Unstarted => match self.direction {
                Direction::FromMostRecent => self.cache.anchors().most_recent().await?,
                Direction::FromLeastRecent => self.cache.anchors().least_recent().await?,
            },
            CursorState::At(key) => Some(key),
            CursorState::Exhausted => None,
        };

        let Some(key) = key else {
            return Ok(None);
        };
        if !self.visited.insert(key.clone()) {
            return Ok(None);
        }
        let Some(node) = self.cache.load_node(&key).await? else {
            return Ok(None);
        };

        let following = match self.direction {
            Direction::FromMostRecent => node.less_recent,
            Direction::FromLeastRecent => node.more_recent,
        };
        if let Some(following) = following {
            self.state = CursorState::At(following);
        }
        Ok(Some((node.key, node.value)))
    }

    /// Drains the cursor into a vector of pairs.
    pub async fn try_collect(mut self) -> Result<Vec<(String, V)>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Drains the cursor, keeping only keys.
    pub async fn collect_keys(mut self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        while let Some((key, _)) = self.next().await? {
            keys.push(key);
        }
        Ok(keys)
    }
}
