use std::io::Read;
use std::sync::Arc;

use tessera_types::ContentHash;

use crate::error::StoreResult;

/// File name suffix shared by every state blob, regardless of backend.
pub const STATE_FILE_SUFFIX: &str = ".jsonl.gz";

/// One account's durable content unit: the compressed state stream plus its
/// content fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentAndHash {
    pub account: String,
    pub content: Vec<u8>,
    pub hash: ContentHash,
}

/// A named streaming read handle returned by
/// [`StateContentProvider::read_contents`].
pub struct NamedContent {
    pub name: String,
    pub reader: Box<dyn Read + Send>,
}

impl std::fmt::Debug for NamedContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedContent")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Build the blob name for one account under a prefix.
pub fn state_file_name(prefix: &str, account: &str) -> String {
    format!("{prefix}.{account}{STATE_FILE_SUFFIX}")
}

/// Recover the account name from a blob name under a prefix.
///
/// Returns `None` when the name does not follow the
/// `<prefix>.<account>.jsonl.gz` scheme.
pub fn account_from_file_name<'a>(prefix: &str, name: &'a str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('.')?;
    let account = rest.strip_suffix(STATE_FILE_SUFFIX)?;
    if account.is_empty() || account.contains('/') || account.contains('.') {
        return None;
    }
    Some(account)
}

/// The last path segment of a prefix: the environment name that scopes
/// static file namespaces.
pub fn prefix_base(prefix: &str) -> &str {
    prefix.rsplit('/').next().unwrap_or(prefix)
}

/// Large binary attachments stored outside the line-delimited state stream,
/// namespaced by the same prefix discipline as state blobs.
pub trait StaticFilesSource: Send + Sync {
    /// Read one attachment. `Ok(None)` when it does not exist.
    fn read(&self, prefix: &str, name: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write one attachment, replacing any existing content.
    fn write(&self, prefix: &str, name: &str, data: &[u8]) -> StoreResult<()>;

    /// Move every attachment from one prefix to another.
    fn rename(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<()>;

    /// Remove every attachment under a prefix. Idempotent.
    fn clear(&self, prefix: &str) -> StoreResult<()>;
}

/// Backend abstraction over a named set of compressed state blobs, keyed by
/// a file prefix and a per-account suffix.
///
/// All implementations must satisfy these invariants:
/// - An empty enumeration result means "no state yet" and is not an error;
///   only an unreachable backend is.
/// - `rename` is atomic from the caller's perspective: the old name becomes
///   unreadable and the new name fully readable, or the operation visibly
///   failed.
/// - `clear` is idempotent: clearing already-absent state succeeds.
/// - Content fingerprints are computed from content, never from backend
///   metadata, so digests agree across backend implementations after a
///   migration.
/// - All I/O errors are propagated, never silently ignored.
pub trait StateContentProvider: Send + Sync + std::fmt::Debug {
    /// Enumerate the durable blobs under a prefix, sorted by name.
    fn find_state_files(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Streaming read handles for the given blobs.
    ///
    /// Readers stream from the backend; callers must not assume the whole
    /// content fits in memory.
    fn read_contents(&self, paths: &[String]) -> StoreResult<Vec<NamedContent>>;

    /// Durably persist all accounts' content under a prefix.
    ///
    /// Each blob becomes visible only once fully written, so a crash
    /// mid-write cannot expose a half-written account.
    fn write_contents(&self, prefix: &str, contents: &[ContentAndHash]) -> StoreResult<()>;

    /// Move every blob from one prefix to another.
    fn rename(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<()>;

    /// Remove every blob under a prefix. Idempotent.
    fn clear(&self, prefix: &str) -> StoreResult<()>;

    /// The static files store paired with this backend.
    fn static_files(&self) -> Arc<dyn StaticFilesSource>;

    /// Combined content fingerprint of the given blobs, `None` when there
    /// are none.
    ///
    /// The default implementation reads each blob and recomputes its digest
    /// from content. Backends must not replace this with stored metadata
    /// (ETags, mtimes): the digest has to match one computed by a different
    /// backend implementation holding the same content.
    fn get_hash(&self, paths: &[String]) -> StoreResult<Option<ContentHash>> {
        if paths.is_empty() {
            return Ok(None);
        }
        let mut hashes = Vec::with_capacity(paths.len());
        for content in self.read_contents(paths)? {
            let mut reader = content.reader;
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            hashes.push(ContentHash::of_compressed(&buf));
        }
        Ok(Some(ContentHash::combine(&hashes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_roundtrip() {
        let name = state_file_name("/ws/states/prod", "salesforce");
        assert_eq!(name, "/ws/states/prod.salesforce.jsonl.gz");
        assert_eq!(
            account_from_file_name("/ws/states/prod", &name),
            Some("salesforce")
        );
    }

    #[test]
    fn foreign_names_are_rejected() {
        assert_eq!(account_from_file_name("prod", "prod.jsonl.gz"), None);
        assert_eq!(account_from_file_name("prod", "other.salesforce.jsonl.gz"), None);
        assert_eq!(account_from_file_name("prod", "prod.a.b.jsonl.gz"), None);
        assert_eq!(account_from_file_name("prod", "prod.salesforce.jsonl"), None);
    }

    #[test]
    fn prefix_base_takes_last_segment() {
        assert_eq!(prefix_base("/ws/states/prod"), "prod");
        assert_eq!(prefix_base("prod"), "prod");
        assert_eq!(prefix_base("envs/staging"), "staging");
    }
}
