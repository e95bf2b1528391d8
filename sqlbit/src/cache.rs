use crate::generator::StatementKind;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Statements are keyed by descriptor identity, not Rust type, so one cache can
/// serve registries that describe the same type differently.
pub struct CacheKey {
    pub descriptor: u64,
    pub table: String,
    pub kind: StatementKind,
}

/// Generated SQL text shared across calls, bounded by LRU eviction.
pub struct StatementCache {
    inner: Mutex<LruCache<CacheKey, Arc<str>>>,
}

impl StatementCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn get_or_insert_with<F>(&self, descriptor: u64, table: &str, kind: StatementKind, build: F) -> Arc<str>
    where
        F: FnOnce() -> String,
    {
        let key = CacheKey { descriptor, table: table.to_string(), kind };
        // generation is pure, a poisoned cache still holds valid text
        let mut cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
        let sql: Arc<str> = Arc::from(build());
        cache.put(key, sql.clone());
        sql
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).cap().get()
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
