//! Query result caching
//!
//! Two interchangeable backends share the [`Cache`] contract: a bounded
//! in-memory LRU and a directory of JSON files that survives restarts.
pub mod lru;
pub mod persistent;

use crate::error::Result;
use crate::search::Query;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use self::lru::{InMemoryLruCache, LruList};
pub use self::persistent::PersistentCache;

/// Key/value store used to memoise query results.
///
/// `get` and `set` never fail: a backend that cannot read or write degrades
/// to a miss or a no-op. `remove` and `reset` are explicit maintenance
/// operations and report I/O failures.
pub trait Cache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    /// Replace any existing value for `key`.
    fn set(&self, key: K, value: V);

    fn remove(&self, key: &K) -> Result<()>;

    fn reset(&self) -> Result<()>;
}

/// Matched text of one query, one blob per source that matched at all.
///
/// Each blob is the newline-terminated concatenation of that source's
/// matches; everything else in the source is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchBlobSet {
    blobs: Vec<String>,
}

impl MatchBlobSet {
    pub fn new(blobs: Vec<String>) -> Self {
        Self { blobs }
    }

    pub fn blobs(&self) -> &[String] {
        &self.blobs
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl From<Vec<String>> for MatchBlobSet {
    fn from(blobs: Vec<String>) -> Self {
        Self::new(blobs)
    }
}

pub type SharedQueryCache = Arc<dyn Cache<Query, MatchBlobSet>>;
