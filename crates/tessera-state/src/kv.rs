//! Pluggable key-value backing store for the quick-access cache.
//!
//! The orchestrator never talks to a concrete map implementation: it builds
//! namespaced [`KvMap`]s through a [`MapCreator`] and persists them with
//! `flush`. Production deployments plug in a persistent map; the in-memory
//! implementation here backs tests and short-lived embeddings while still
//! surviving re-creation through its creator (namespaces are shared), which
//! is what makes staleness detection observable across handles.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::error::StateResult;

/// One namespaced key-value map.
///
/// Values are opaque JSON; namespacing and key layout are the caller's
/// concern. `flush` persists the map's own backing store and reports
/// whether anything was written.
pub trait KvMap: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    fn set(&mut self, key: &str, value: serde_json::Value);

    /// Remove a key. Returns `true` if it existed.
    fn delete(&mut self, key: &str) -> bool;

    /// All keys, sorted.
    fn keys(&self) -> Vec<String>;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the backing store. Returns `true` if anything was written.
    fn flush(&mut self) -> StateResult<bool>;
}

/// Factory for namespaced maps.
pub trait MapCreator: Send + Sync {
    fn create(&self, namespace: &str) -> StateResult<Box<dyn KvMap>>;
}

type Shared = Arc<RwLock<BTreeMap<String, serde_json::Value>>>;

/// In-memory map creator.
///
/// Maps created for the same namespace share storage, so a fresh handle
/// built from the same creator sees previously written data, mirroring a
/// persistent map reopened from disk.
pub struct InMemoryMapCreator {
    namespaces: RwLock<HashMap<String, Shared>>,
}

impl InMemoryMapCreator {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryMapCreator {
    fn default() -> Self {
        Self::new()
    }
}

impl MapCreator for InMemoryMapCreator {
    fn create(&self, namespace: &str) -> StateResult<Box<dyn KvMap>> {
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        let shared = namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::new())));
        Ok(Box::new(InMemoryKvMap {
            inner: Arc::clone(shared),
        }))
    }
}

struct InMemoryKvMap {
    inner: Shared,
}

impl KvMap for InMemoryKvMap {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.read().expect("lock poisoned").get(key).cloned()
    }

    fn set(&mut self, key: &str, value: serde_json::Value) {
        self.inner
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), value);
    }

    fn delete(&mut self, key: &str) -> bool {
        self.inner.write().expect("lock poisoned").remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.inner.read().expect("lock poisoned").keys().cloned().collect()
    }

    fn clear(&mut self) {
        self.inner.write().expect("lock poisoned").clear();
    }

    fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").len()
    }

    fn flush(&mut self) -> StateResult<bool> {
        // Nothing to persist: the shared map is the backing store.
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let creator = InMemoryMapCreator::new();
        let mut map = creator.create("test-elements").unwrap();

        map.set("a", serde_json::json!(1));
        assert_eq!(map.get("a").unwrap(), 1);
        assert!(map.delete("a"));
        assert!(!map.delete("a"));
        assert!(map.is_empty());
    }

    #[test]
    fn keys_are_sorted() {
        let creator = InMemoryMapCreator::new();
        let mut map = creator.create("test").unwrap();
        map.set("b", serde_json::json!(2));
        map.set("a", serde_json::json!(1));
        assert_eq!(map.keys(), vec!["a", "b"]);
    }

    #[test]
    fn same_namespace_shares_storage() {
        let creator = InMemoryMapCreator::new();
        let mut first = creator.create("shared").unwrap();
        first.set("k", serde_json::json!("v"));

        let second = creator.create("shared").unwrap();
        assert_eq!(second.get("k").unwrap(), "v");
    }

    #[test]
    fn different_namespaces_are_isolated() {
        let creator = InMemoryMapCreator::new();
        let mut first = creator.create("one").unwrap();
        first.set("k", serde_json::json!(1));

        let second = creator.create("two").unwrap();
        assert_eq!(second.get("k"), None);
    }

    #[test]
    fn flush_reports_nothing_written() {
        let creator = InMemoryMapCreator::new();
        let mut map = creator.create("test").unwrap();
        assert!(!map.flush().unwrap());
    }
}
