use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::static_files::LocalStaticFiles;
use crate::traits::{
    account_from_file_name, state_file_name, ContentAndHash, NamedContent, StateContentProvider,
    StaticFilesSource,
};

/// Local filesystem content provider.
///
/// Blobs live at `<prefix>.<account>.jsonl.gz`, where the prefix is a path
/// base (directory plus environment name). Writes go through a temporary
/// file in the destination directory followed by an atomic rename, so a
/// crash mid-write never exposes a half-written blob. Static files live
/// under `<local_storage_dir>/static-resources`.
#[derive(Debug)]
pub struct FileContentProvider {
    static_files: Arc<LocalStaticFiles>,
}

/// Split a prefix into its directory and base-name parts.
///
/// A bare prefix with no directory component maps to the current directory.
fn split_prefix(prefix: &str) -> (PathBuf, String) {
    let path = Path::new(prefix);
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| prefix.to_string());
    (dir, base)
}

impl FileContentProvider {
    /// Create a provider rooted at the workspace's local storage directory.
    pub fn new(local_storage_dir: impl Into<PathBuf>) -> Self {
        let dir = local_storage_dir.into();
        Self {
            static_files: Arc::new(LocalStaticFiles::new(dir.join("static-resources"))),
        }
    }
}

impl StateContentProvider for FileContentProvider {
    fn find_state_files(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let (dir, base) = split_prefix(prefix);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            // No directory yet means no state yet, which is a valid empty
            // result rather than an unreachable backend.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::NotFound(format!(
                "state directory {}: {e}",
                dir.display()
            ))),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(account) = account_from_file_name(&base, name) {
                found.push(state_file_name(prefix, account));
            }
        }
        found.sort();
        Ok(found)
    }

    fn read_contents(&self, paths: &[String]) -> StoreResult<Vec<NamedContent>> {
        paths
            .iter()
            .map(|path| {
                let file = std::fs::File::open(path)?;
                Ok(NamedContent {
                    name: path.clone(),
                    reader: Box::new(file) as Box<dyn io::Read + Send>,
                })
            })
            .collect()
    }

    fn write_contents(&self, prefix: &str, contents: &[ContentAndHash]) -> StoreResult<()> {
        let (dir, _) = split_prefix(prefix);
        std::fs::create_dir_all(&dir)?;

        for unit in contents {
            let final_path = state_file_name(prefix, &unit.account);
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&unit.content)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&final_path).map_err(|e| StoreError::Io(e.error))?;
            debug!(path = %final_path, bytes = unit.content.len(), "wrote state file");
        }
        Ok(())
    }

    fn rename(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<()> {
        let files = self.find_state_files(old_prefix)?;
        if !files.is_empty() {
            let (new_dir, _) = split_prefix(new_prefix);
            std::fs::create_dir_all(&new_dir)?;
        }
        for path in files {
            let Some(account) = account_from_file_name(old_prefix, &path) else {
                continue;
            };
            let new_path = state_file_name(new_prefix, account);
            std::fs::rename(&path, &new_path)?;
            debug!(from = %path, to = %new_path, "renamed state file");
        }
        Ok(())
    }

    fn clear(&self, prefix: &str) -> StoreResult<()> {
        for path in self.find_state_files(prefix)? {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn static_files(&self) -> Arc<dyn StaticFilesSource> {
        Arc::clone(&self.static_files) as Arc<dyn StaticFilesSource>
    }
}
