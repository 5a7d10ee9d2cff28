//! Cache stores for computed sequence values.
//!
//! # Responsibilities
//! - Hold `n -> Fib(n)` entries for the evaluator
//! - Serve concurrent readers without a global exclusive lock
//!
//! # Design Decisions
//! - Entries are never evicted and carry no TTL; with the index cap the key
//!   space is at most 93 entries
//! - Stores may be fallible (an external process); callers treat a failed
//!   read as a miss and a failed write as a logged no-op

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a cache store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    /// The stored value could not be decoded.
    #[error("corrupt cache entry for n={n}: {reason}")]
    Corrupt { n: u32, reason: String },
}

/// A concurrency-safe `n -> Fib(n)` store.
pub trait CacheStore: Send + Sync {
    /// Look up a value. `Ok(None)` is a clean miss.
    fn get(&self, n: u32) -> Result<Option<i64>, StoreError>;

    /// Insert or overwrite a value. Overwrites are idempotent.
    fn put(&self, n: u32, value: i64) -> Result<(), StoreError>;

    /// Number of entries currently stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process store backed by a sharded map.
///
/// Reads take a shard read lock; a write locks only the shard holding its key.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<u32, i64>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, n: u32) -> Result<Option<i64>, StoreError> {
        Ok(self.inner.get(&n).map(|r| *r.value()))
    }

    fn put(&self, n: u32, value: i64) -> Result<(), StoreError> {
        self.inner.insert(n, value);
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.inner.len())
            .finish()
    }
}
