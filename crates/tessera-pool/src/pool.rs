use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::cache::LocationCache;

struct PoolEntry {
    cache: Arc<LocationCache>,
    refs: usize,
}

/// Pool accounting, observable by callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Caches created because no live instance existed for the location.
    pub created: u64,
    /// Acquisitions that shared an already-live instance.
    pub reused: u64,
    /// Locations with a live cache right now.
    pub live: usize,
}

/// Reference-counted pool of [`LocationCache`]s, at most one per location.
///
/// The per-location refcount is guarded by the map's per-key entry locking:
/// concurrent `get`/`release` pairs for one location serialize, while
/// different locations proceed independently.
pub struct CachePool {
    entries: DashMap<String, PoolEntry>,
    created: AtomicU64,
    reused: AtomicU64,
}

impl CachePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        }
    }

    /// Acquire the cache for a location, creating it if absent.
    ///
    /// The capacity hint only applies when the call creates the cache; a
    /// shared instance keeps the capacity it was created with.
    pub fn get(&self, location: &str, capacity_hint: usize) -> Arc<LocationCache> {
        match self.entries.entry(location.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.refs += 1;
                self.reused.fetch_add(1, Ordering::Relaxed);
                debug!(location, refs = entry.refs, "reusing location cache");
                Arc::clone(&entry.cache)
            }
            Entry::Vacant(vacant) => {
                let cache = Arc::new(LocationCache::new(location, capacity_hint));
                vacant.insert(PoolEntry {
                    cache: Arc::clone(&cache),
                    refs: 1,
                });
                self.created.fetch_add(1, Ordering::Relaxed);
                debug!(location, capacity = cache.capacity(), "created location cache");
                cache
            }
        }
    }

    /// Release one reference to a location's cache.
    ///
    /// When the last reference is released the entry is removed and the
    /// cache dropped; the next `get` for that location creates a fresh one.
    pub fn release(&self, cache: &LocationCache) {
        self.release_location(cache.location());
    }

    /// Release by location key.
    pub fn release_location(&self, location: &str) {
        match self.entries.entry(location.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.refs -= 1;
                if entry.refs == 0 {
                    occupied.remove();
                    debug!(location, "dropped location cache");
                } else {
                    debug!(location, refs = entry.refs, "released location cache reference");
                }
            }
            Entry::Vacant(_) => {
                warn!(location, "released a location with no live cache");
            }
        }
    }

    /// Current accounting.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            live: self.entries.len(),
        }
    }
}

impl Default for CachePool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CachePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachePool")
            .field("live", &self.entries.len())
            .finish()
    }
}
