//! Bounded regeneration cache keyed by (specification hash, package name).
//!
//! Two independent invalidation mechanisms, both checked on every read:
//! least-recently-inserted eviction at capacity, and time-based expiry.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 128;
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub spec_hash: String,
    pub package: String,
}

impl CacheKey {
    pub fn new(spec_hash: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            spec_hash: spec_hash.into(),
            package: package.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

struct Inner<V> {
    entries: IndexMap<CacheKey, Entry<V>>,
    stats: CacheStats,
}

/// Owned, lock-guarded cache; counters live under the same lock as entries.
pub struct RegenerationCache<V = Vec<String>> {
    inner: Mutex<Inner<V>>,
    capacity: usize,
    ttl: Duration,
}

impl<V: Clone> RegenerationCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: IndexMap::with_capacity(capacity.min(1024)),
                stats: CacheStats::default(),
            }),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            None => {
                inner.stats.misses += 1;
                return None;
            }
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
        };
        if expired {
            inner.entries.shift_remove(key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            return None;
        }
        inner.stats.hits += 1;
        inner.entries.get(key).map(|e| e.value.clone())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace. Replacing moves the key to the newest position.
    pub fn insert(&self, key: CacheKey, value: V) {
        let mut inner = self.inner.lock();
        inner.entries.shift_remove(&key);
        while inner.entries.len() >= self.capacity {
            if let Some((evicted, _)) = inner.entries.shift_remove_index(0) {
                inner.stats.evictions += 1;
                debug!(
                    spec_hash = %evicted.spec_hash,
                    package = %evicted.package,
                    "Evicted regeneration cache entry"
                );
            } else {
                break;
            }
        }
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.inner.lock().entries.shift_remove(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            ..inner.stats
        }
    }
}

impl<V: Clone> Default for RegenerationCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}
