use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::static_files::InMemoryStaticFiles;
use crate::traits::{
    account_from_file_name, state_file_name, ContentAndHash, NamedContent, StateContentProvider,
    StaticFilesSource,
};

/// In-memory content provider.
///
/// Intended for tests and embedding. All blobs are held in memory behind a
/// `RwLock`; reads hand out cursors over cloned content. Doubles as the
/// second backend in migration tests, since it shares no storage with the
/// filesystem provider.
pub struct InMemoryContentProvider {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    static_files: Arc<InMemoryStaticFiles>,
}

impl InMemoryContentProvider {
    /// Create a new empty in-memory provider.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            static_files: Arc::new(InMemoryStaticFiles::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.files.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.files.read().expect("lock poisoned").is_empty()
    }

    /// Insert a raw blob directly, bypassing the provider contract.
    ///
    /// Test hook: simulates content written by another writer (staleness
    /// scenarios) or by a different backend implementation.
    pub fn insert_file(&self, name: impl Into<String>, content: Vec<u8>) {
        self.files
            .write()
            .expect("lock poisoned")
            .insert(name.into(), content);
    }

    /// Read a raw blob directly. Test hook.
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files.read().expect("lock poisoned").get(name).cloned()
    }
}

impl Default for InMemoryContentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StateContentProvider for InMemoryContentProvider {
    fn find_state_files(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let files = self.files.read().expect("lock poisoned");
        Ok(files
            .keys()
            .filter(|name| account_from_file_name(prefix, name).is_some())
            .cloned()
            .collect())
    }

    fn read_contents(&self, paths: &[String]) -> StoreResult<Vec<NamedContent>> {
        let files = self.files.read().expect("lock poisoned");
        paths
            .iter()
            .map(|path| {
                let content = files.get(path).cloned().ok_or_else(|| {
                    StoreError::NotFound(format!("state blob {path}"))
                })?;
                Ok(NamedContent {
                    name: path.clone(),
                    reader: Box::new(Cursor::new(content)) as Box<dyn std::io::Read + Send>,
                })
            })
            .collect()
    }

    fn write_contents(&self, prefix: &str, contents: &[ContentAndHash]) -> StoreResult<()> {
        let mut files = self.files.write().expect("lock poisoned");
        for unit in contents {
            files.insert(state_file_name(prefix, &unit.account), unit.content.clone());
        }
        Ok(())
    }

    fn rename(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<()> {
        let mut files = self.files.write().expect("lock poisoned");
        let to_move: Vec<String> = files
            .keys()
            .filter(|name| account_from_file_name(old_prefix, name).is_some())
            .cloned()
            .collect();
        for name in to_move {
            let account = account_from_file_name(old_prefix, &name)
                .expect("filtered above")
                .to_string();
            let content = files.remove(&name).expect("filtered above");
            files.insert(state_file_name(new_prefix, &account), content);
        }
        Ok(())
    }

    fn clear(&self, prefix: &str) -> StoreResult<()> {
        let mut files = self.files.write().expect("lock poisoned");
        files.retain(|name, _| account_from_file_name(prefix, name).is_none());
        Ok(())
    }

    fn static_files(&self) -> Arc<dyn StaticFilesSource> {
        Arc::clone(&self.static_files) as Arc<dyn StaticFilesSource>
    }
}

impl std::fmt::Debug for InMemoryContentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentProvider")
            .field("blob_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use tessera_types::ContentHash;

    fn unit(account: &str, content: &[u8]) -> ContentAndHash {
        ContentAndHash {
            account: account.to_string(),
            content: content.to_vec(),
            hash: ContentHash::of_compressed(content),
        }
    }

    #[test]
    fn write_find_read() {
        let provider = InMemoryContentProvider::new();
        provider
            .write_contents("prod", &[unit("salesforce", b"sf"), unit("zendesk", b"zd")])
            .unwrap();

        let files = provider.find_state_files("prod").unwrap();
        assert_eq!(files, vec!["prod.salesforce.jsonl.gz", "prod.zendesk.jsonl.gz"]);

        let mut contents = provider.read_contents(&files).unwrap();
        let mut buf = Vec::new();
        contents[1].reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"zd");
    }

    #[test]
    fn prefixes_are_isolated() {
        let provider = InMemoryContentProvider::new();
        provider.write_contents("prod", &[unit("salesforce", b"p")]).unwrap();
        provider.write_contents("staging", &[unit("salesforce", b"s")]).unwrap();

        assert_eq!(provider.find_state_files("prod").unwrap().len(), 1);
        provider.clear("prod").unwrap();
        assert!(provider.find_state_files("prod").unwrap().is_empty());
        assert_eq!(provider.find_state_files("staging").unwrap().len(), 1);
    }

    #[test]
    fn read_missing_blob_is_an_error() {
        let provider = InMemoryContentProvider::new();
        let err = provider
            .read_contents(&["prod.salesforce.jsonl.gz".to_string()])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn rename_moves_and_clears_old_prefix() {
        let provider = InMemoryContentProvider::new();
        provider.write_contents("prod", &[unit("salesforce", b"sf")]).unwrap();
        provider.rename("prod", "renamed").unwrap();

        assert!(provider.find_state_files("prod").unwrap().is_empty());
        let files = provider.find_state_files("renamed").unwrap();
        assert_eq!(files, vec!["renamed.salesforce.jsonl.gz"]);
    }

    #[test]
    fn clear_twice_is_fine() {
        let provider = InMemoryContentProvider::new();
        provider.write_contents("prod", &[unit("salesforce", b"sf")]).unwrap();
        provider.clear("prod").unwrap();
        provider.clear("prod").unwrap();
        assert!(provider.is_empty());
    }

    #[test]
    fn hash_agrees_with_file_backend_for_same_content() {
        // Cross-backend equivalence: digests are recomputed from content,
        // so two different backends holding the same bytes must agree.
        let memory = InMemoryContentProvider::new();
        let dir = tempfile::tempdir().unwrap();
        let file = crate::file::FileContentProvider::new(dir.path());
        let prefix = dir.path().join("prod").to_string_lossy().into_owned();

        let units = [unit("salesforce", b"identical"), unit("zendesk", b"bytes")];
        memory.write_contents("prod", &units).unwrap();
        file.write_contents(&prefix, &units).unwrap();

        let mem_hash = memory
            .get_hash(&memory.find_state_files("prod").unwrap())
            .unwrap();
        let file_hash = file
            .get_hash(&file.find_state_files(&prefix).unwrap())
            .unwrap();
        assert_eq!(mem_hash, file_hash);
    }
}
