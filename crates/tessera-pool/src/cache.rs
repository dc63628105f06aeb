use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// A bounded LRU cache scoped to one workspace location.
///
/// Holds parsed values keyed by string (typically a content hash), evicting
/// least-recently-used entries once the capacity is reached. Owned by
/// exactly one [`CachePool`](crate::CachePool) at a time.
pub struct LocationCache {
    location: String,
    capacity: NonZeroUsize,
    inner: Mutex<LruCache<String, serde_json::Value>>,
}

impl LocationCache {
    pub(crate) fn new(location: &str, capacity_hint: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity_hint).unwrap_or(NonZeroUsize::MIN);
        Self {
            location: location.to_string(),
            capacity,
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The location key this cache is scoped to.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The bounded capacity.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Look up a value, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.lock().expect("lock poisoned").get(key).cloned()
    }

    /// Insert a value, evicting the least recently used entry if full.
    pub fn put(&self, key: impl Into<String>, value: serde_json::Value) {
        self.inner.lock().expect("lock poisoned").put(key.into(), value);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("lock poisoned").len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LocationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationCache")
            .field("location", &self.location)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
