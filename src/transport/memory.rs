//! In-memory response store.
//!
//! LRU eviction bounded both by entry count and by the total size of stored
//! bodies.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use super::caching::{CachedResponse, ResponseStore};

/// Default capacity: 64MB of response bodies
pub const DEFAULT_MEMORY_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Process-local LRU store for origin responses.
pub struct MemoryStore {
    cache: RwLock<LruCache<String, CachedResponse>>,

    /// Maximum total body size in bytes
    max_size: usize,

    /// Current total body size in bytes
    current_size: RwLock<usize>,
}

impl MemoryStore {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CACHE_CAPACITY)
    }

    /// Create a store holding at most `max_size` bytes of bodies.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a store with explicit size and entry limits.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(max_entries)),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// Number of stored responses.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Total size of stored bodies in bytes.
    pub async fn size(&self) -> usize {
        *self.current_size.read().await
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    async fn put(&self, key: &str, response: CachedResponse) {
        let body_size = response.body.len();
        if body_size > self.max_size {
            return;
        }

        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        if let Some(old) = cache.peek(key) {
            *current_size = current_size.saturating_sub(old.body.len());
        }

        // A full LRU drops its oldest entry on insert; a replaced entry was
        // already subtracted above.
        if let Some((evicted_key, evicted)) = cache.push(key.to_string(), response) {
            if evicted_key != key {
                *current_size = current_size.saturating_sub(evicted.body.len());
            }
        }
        *current_size += body_size;

        while *current_size > self.max_size {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    *current_size = current_size.saturating_sub(evicted.body.len());
                }
                None => {
                    *current_size = 0;
                    break;
                }
            }
        }
    }
}
