use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use tracing::debug;

use crate::error::StoreResult;
use crate::traits::StaticFilesSource;

/// Filesystem-backed static files store.
///
/// Attachments live under `<root>/<namespace>/<name>`, where the namespace
/// is the environment name derived from the state file prefix. Renaming a
/// namespace is a single directory move.
#[derive(Debug)]
pub struct LocalStaticFiles {
    root: PathBuf,
}

impl LocalStaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StaticFilesSource for LocalStaticFiles {
    fn read(&self, prefix: &str, name: &str) -> StoreResult<Option<Vec<u8>>> {
        match std::fs::read(self.root.join(prefix).join(name)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, prefix: &str, name: &str, data: &[u8]) -> StoreResult<()> {
        let path = self.root.join(prefix).join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, data)?;
        Ok(())
    }

    fn rename(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<()> {
        let old_dir = self.root.join(old_prefix);
        if !old_dir.exists() {
            return Ok(());
        }
        let new_dir = self.root.join(new_prefix);
        std::fs::create_dir_all(&self.root)?;
        std::fs::rename(&old_dir, &new_dir)?;
        debug!(from = old_prefix, to = new_prefix, "renamed static files namespace");
        Ok(())
    }

    fn clear(&self, prefix: &str) -> StoreResult<()> {
        match std::fs::remove_dir_all(self.root.join(prefix)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory static files store, paired with the in-memory content provider.
#[derive(Debug)]
pub struct InMemoryStaticFiles {
    namespaces: RwLock<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryStaticFiles {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryStaticFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticFilesSource for InMemoryStaticFiles {
    fn read(&self, prefix: &str, name: &str) -> StoreResult<Option<Vec<u8>>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces
            .get(prefix)
            .and_then(|files| files.get(name))
            .cloned())
    }

    fn write(&self, prefix: &str, name: &str, data: &[u8]) -> StoreResult<()> {
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        namespaces
            .entry(prefix.to_string())
            .or_default()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn rename(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<()> {
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        if let Some(files) = namespaces.remove(old_prefix) {
            namespaces.insert(new_prefix.to_string(), files);
        }
        Ok(())
    }

    fn clear(&self, prefix: &str) -> StoreResult<()> {
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        namespaces.remove(prefix);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_write_read_rename_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStaticFiles::new(dir.path());

        store.write("prod", "logo.png", b"png-bytes").unwrap();
        assert_eq!(store.read("prod", "logo.png").unwrap().unwrap(), b"png-bytes");
        assert_eq!(store.read("prod", "missing.png").unwrap(), None);

        store.rename("prod", "renamed").unwrap();
        assert_eq!(store.read("prod", "logo.png").unwrap(), None);
        assert_eq!(store.read("renamed", "logo.png").unwrap().unwrap(), b"png-bytes");

        store.clear("renamed").unwrap();
        store.clear("renamed").unwrap();
        assert_eq!(store.read("renamed", "logo.png").unwrap(), None);
    }

    #[test]
    fn local_rename_of_missing_namespace_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStaticFiles::new(dir.path());
        store.rename("never-written", "elsewhere").unwrap();
    }

    #[test]
    fn memory_namespaces_are_isolated() {
        let store = InMemoryStaticFiles::new();
        store.write("prod", "a.bin", b"prod-a").unwrap();
        store.write("staging", "a.bin", b"staging-a").unwrap();

        assert_eq!(store.read("prod", "a.bin").unwrap().unwrap(), b"prod-a");
        store.clear("prod").unwrap();
        assert_eq!(store.read("prod", "a.bin").unwrap(), None);
        assert_eq!(store.read("staging", "a.bin").unwrap().unwrap(), b"staging-a");
    }

    #[test]
    fn memory_rename_moves_whole_namespace() {
        let store = InMemoryStaticFiles::new();
        store.write("prod", "a.bin", b"a").unwrap();
        store.write("prod", "b.bin", b"b").unwrap();

        store.rename("prod", "renamed").unwrap();
        assert_eq!(store.read("renamed", "a.bin").unwrap().unwrap(), b"a");
        assert_eq!(store.read("renamed", "b.bin").unwrap().unwrap(), b"b");
        assert_eq!(store.read("prod", "a.bin").unwrap(), None);
    }
}
