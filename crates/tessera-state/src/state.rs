//! The workspace state orchestrator.

use std::sync::Arc;

use tracing::{debug, info};

use tessera_codec::{deserialize_account, serialize_account};
use tessera_store::{
    prefix_base, provider_from_config, ContentAndHash, StateContentProvider,
};
use tessera_types::{Change, ContentHash, ElemId, Element, PathIndex, StateConfig};

use crate::data::StateData;
use crate::error::StateResult;
use crate::kv::MapCreator;
use crate::lifecycle::Lifecycle;

fn unix_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Stateful coordinator for one workspace environment's durable state.
///
/// Loads lazily: the quick-access cache is built on first access, and
/// durable content is parsed only when the cache's recorded hash disagrees
/// with the durable content's current hash. Mutations stay in memory until
/// [`flush`](Self::flush); per-account content+hash pairs are memoized
/// between mutations so repeated hash computations are free.
///
/// Every mutating operation takes `&mut self`: the single-logical-writer
/// contract is enforced by the borrow checker instead of by convention.
pub struct WorkspaceState {
    workspace_id: String,
    provider: Arc<dyn StateContentProvider>,
    file_prefix: String,
    map_creator: Arc<dyn MapCreator>,
    data: Option<StateData>,
    lifecycle: Lifecycle,
    contents_cache: Option<Vec<ContentAndHash>>,
}

impl WorkspaceState {
    /// Create a handle over an existing provider. No I/O happens until the
    /// first access.
    pub fn new(
        workspace_id: impl Into<String>,
        provider: Arc<dyn StateContentProvider>,
        file_prefix: impl Into<String>,
        map_creator: Arc<dyn MapCreator>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            provider,
            file_prefix: file_prefix.into(),
            map_creator,
            data: None,
            lifecycle: Lifecycle::new(),
            contents_cache: None,
        }
    }

    /// Create a handle from a workspace state configuration.
    ///
    /// Configuration problems fail here, synchronously, before any I/O.
    pub fn from_config(
        workspace_id: impl Into<String>,
        config: &StateConfig,
        file_prefix: impl Into<String>,
        map_creator: Arc<dyn MapCreator>,
    ) -> StateResult<Self> {
        let workspace_id = workspace_id.into();
        let provider = provider_from_config(&workspace_id, config)?;
        Ok(Self::new(workspace_id, provider, file_prefix, map_creator))
    }

    /// The workspace this handle belongs to.
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// The active durable file prefix.
    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    // ---------------------------------------------------------------
    // Lazy load
    // ---------------------------------------------------------------

    /// Build the cache structure and reconcile it against durable content.
    ///
    /// A hash mismatch triggers a full reparse and marks the cache dirty;
    /// the durable content itself is authoritative and untouched.
    fn ensure_loaded(&mut self) -> StateResult<()> {
        if self.data.is_some() {
            return Ok(());
        }
        let env = prefix_base(&self.file_prefix).to_string();
        let mut data = StateData::create(self.map_creator.as_ref(), &env)?;

        let files = self.provider.find_state_files(&self.file_prefix)?;
        let durable = self.provider.get_hash(&files)?;
        let recorded = data.recorded_hash();
        match (&durable, &recorded) {
            (Some(current), recorded) if recorded.as_ref() != Some(current) => {
                debug!(
                    workspace = %self.workspace_id,
                    durable = %current,
                    "state cache is stale, reparsing durable content"
                );
                self.reparse_into(&mut data, &files)?;
                data.set_hash(current);
                self.lifecycle.mark_cache_dirty();
            }
            (None, Some(_)) => {
                debug!(
                    workspace = %self.workspace_id,
                    "durable state content is gone, resetting cache"
                );
                data.clear_all();
                self.lifecycle.mark_cache_dirty();
            }
            _ => {}
        }
        self.data = Some(data);
        Ok(())
    }

    fn reparse_into(&self, data: &mut StateData, files: &[String]) -> StateResult<()> {
        data.clear_all();
        let mut accounts = Vec::new();
        let mut merged_index = PathIndex::new();
        for content in self.provider.read_contents(files)? {
            let parsed = deserialize_account(content.reader)?;
            for element in &parsed.elements {
                data.set_element(element);
            }
            accounts.extend(parsed.accounts);
            merged_index.merge(parsed.path_index);
        }
        data.replace_path_index(&merged_index)?;
        data.set_accounts(accounts);
        Ok(())
    }

    fn data_mut(&mut self) -> StateResult<&mut StateData> {
        self.ensure_loaded()?;
        Ok(self.data.as_mut().expect("state data loaded"))
    }

    /// Forget memoized contents after any in-memory mutation.
    fn mark_mutated(&mut self) {
        self.lifecycle.mark_dirty();
        self.contents_cache = None;
    }

    // ---------------------------------------------------------------
    // Read access
    // ---------------------------------------------------------------

    /// One element by identifier, `None` if absent.
    pub fn element(&mut self, id: &ElemId) -> StateResult<Option<Element>> {
        Ok(self.data_mut()?.element(id))
    }

    /// Whether an element is present.
    pub fn has_element(&mut self, id: &ElemId) -> StateResult<bool> {
        Ok(self.data_mut()?.has_element(id))
    }

    /// All elements, sorted by identifier.
    pub fn elements(&mut self) -> StateResult<Vec<Element>> {
        self.data_mut()?.all_elements()
    }

    /// All element identifiers, sorted.
    pub fn element_ids(&mut self) -> StateResult<Vec<ElemId>> {
        self.data_mut()?.element_ids()
    }

    /// The accounts represented in this state, sorted.
    pub fn accounts(&mut self) -> StateResult<Vec<String>> {
        Ok(self.data_mut()?.accounts())
    }

    /// The full path index.
    pub fn path_index(&mut self) -> StateResult<PathIndex> {
        self.data_mut()?.path_index()
    }

    /// The recorded workspace-level content hash, if any.
    pub fn hash(&mut self) -> StateResult<Option<ContentHash>> {
        Ok(self.data_mut()?.recorded_hash())
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Insert or replace one element. In-memory only until `flush`.
    pub fn set(&mut self, element: Element) -> StateResult<()> {
        let data = self.data_mut()?;
        data.add_account(element.account());
        data.set_element(&element);
        self.mark_mutated();
        Ok(())
    }

    /// Remove one element (and its path index entry). Returns `true` if it
    /// was present.
    pub fn remove(&mut self, id: &ElemId) -> StateResult<bool> {
        let data = self.data_mut()?;
        let removed = data.remove_element(id);
        data.remove_path_entry(id);
        if removed {
            self.mark_mutated();
        }
        Ok(removed)
    }

    /// Apply a batch of detailed changes.
    ///
    /// Additions and modifications overwrite the stored element; removals
    /// delete element and path entry. `path_hints` carries source paths for
    /// changed elements; `fetch_accounts` extends the account list for
    /// accounts whose fetch produced no elements.
    pub fn update_from_changes(
        &mut self,
        changes: &[Change],
        path_hints: Option<&PathIndex>,
        fetch_accounts: Option<&[String]>,
    ) -> StateResult<()> {
        let data = self.data_mut()?;
        for change in changes {
            match change.applied_element() {
                Some(element) => {
                    data.add_account(element.account());
                    data.set_element(element);
                }
                None => {
                    data.remove_element(change.target());
                    data.remove_path_entry(change.target());
                }
            }
        }
        if let Some(hints) = path_hints {
            for (id, paths) in hints.iter() {
                data.set_path_entry(id, paths)?;
            }
        }
        if let Some(fetched) = fetch_accounts {
            let mut names = data.accounts();
            names.extend(fetched.iter().cloned());
            data.set_accounts(names);
        }
        self.mark_mutated();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Hashing and durability
    // ---------------------------------------------------------------

    /// Per-account content and hash for the current in-memory state.
    ///
    /// Memoized until the next mutation, so repeated calls (hashing, flush,
    /// migration) serialize each account once.
    pub fn content_and_hash(&mut self) -> StateResult<Vec<ContentAndHash>> {
        self.ensure_loaded()?;
        if let Some(cached) = &self.contents_cache {
            return Ok(cached.clone());
        }
        let data = self.data.as_ref().expect("state data loaded");
        let elements = data.all_elements()?;
        let index = data.path_index()?;

        let mut accounts = data.accounts();
        for element in &elements {
            let account = element.account();
            if !accounts.iter().any(|existing| existing == account) {
                accounts.push(account.to_string());
            }
        }
        accounts.sort();
        accounts.dedup();

        let mut contents = Vec::with_capacity(accounts.len());
        for account in &accounts {
            let account_elements: Vec<Element> = elements
                .iter()
                .filter(|element| element.account() == account)
                .cloned()
                .collect();
            let bytes =
                serialize_account(&account_elements, account, &index.for_account(account))?;
            let hash = ContentHash::of_compressed(&bytes);
            contents.push(ContentAndHash {
                account: account.clone(),
                content: bytes,
                hash,
            });
        }
        self.contents_cache = Some(contents.clone());
        Ok(contents)
    }

    /// Recompute and record the workspace-level content hash.
    ///
    /// No-op unless dirty. Never writes durable content, so callers can
    /// learn the would-be hash without touching storage.
    pub fn calculate_hash(&mut self) -> StateResult<()> {
        if !self.lifecycle.is_dirty() {
            return Ok(());
        }
        let contents = self.content_and_hash()?;
        let hashes: Vec<ContentHash> = contents.iter().map(|c| c.hash.clone()).collect();
        let data = self.data_mut()?;
        if hashes.is_empty() {
            data.clear_hash();
        } else {
            data.set_hash(&ContentHash::combine(&hashes));
        }
        self.lifecycle.mark_cache_dirty();
        Ok(())
    }

    /// Persist in-memory state.
    ///
    /// When dirty: writes every account's content through the provider,
    /// records the combined hash, then persists the cache's backing store.
    /// When only the cache is dirty (after a reparse), persists the backing
    /// store without writing durable content. A failed durable write leaves
    /// the dirty flag set so the flush can be retried.
    pub fn flush(&mut self) -> StateResult<()> {
        self.ensure_loaded()?;
        if self.lifecycle.is_dirty() {
            let contents = self.content_and_hash()?;
            self.provider.write_contents(&self.file_prefix, &contents)?;
            let hashes: Vec<ContentHash> = contents.iter().map(|c| c.hash.clone()).collect();
            let data = self.data.as_mut().expect("state data loaded");
            if hashes.is_empty() {
                data.clear_hash();
            } else {
                data.set_hash(&ContentHash::combine(&hashes));
            }
            data.set_version(env!("CARGO_PKG_VERSION"));
            self.lifecycle.durable_synced();
            self.lifecycle.mark_cache_dirty();
            debug!(
                workspace = %self.workspace_id,
                accounts = hashes.len(),
                "flushed state content"
            );
        }
        if self.lifecycle.is_cache_dirty() {
            let data = self.data.as_mut().expect("state data loaded");
            let persisted = data.flush_all()?;
            debug!(persisted, "persisted state cache backing store");
            self.lifecycle.cache_synced();
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Lifecycle operations
    // ---------------------------------------------------------------

    /// Clear durable content, cache, and static files. Idempotent.
    pub fn clear(&mut self) -> StateResult<()> {
        self.ensure_loaded()?;
        self.provider.clear(&self.file_prefix)?;
        self.provider
            .static_files()
            .clear(prefix_base(&self.file_prefix))?;
        self.data.as_mut().expect("state data loaded").clear_all();
        self.mark_mutated();
        Ok(())
    }

    /// Move durable content and static files to a new prefix.
    ///
    /// Marks dirty so the next flush re-records the hash under the new
    /// prefix.
    pub fn rename(&mut self, new_prefix: &str) -> StateResult<()> {
        let old_env = prefix_base(&self.file_prefix).to_string();
        let new_env = prefix_base(new_prefix).to_string();
        self.provider.static_files().rename(&old_env, &new_env)?;
        self.provider.rename(&self.file_prefix, new_prefix)?;
        self.file_prefix = new_prefix.to_string();
        self.lifecycle.mark_dirty();
        Ok(())
    }

    /// Migrate durable content to a different provider.
    ///
    /// Order matters: current content is written under a temporary prefix
    /// via the NEW provider first, the old provider is cleared second, and
    /// the temporary name is renamed into place last. A crash before the
    /// swap leaves the old backend authoritative or both present, never
    /// neither. The temporary prefix avoids name collisions when both
    /// providers share a filesystem path.
    pub fn migrate_to(&mut self, new_provider: Arc<dyn StateContentProvider>) -> StateResult<()> {
        self.ensure_loaded()?;
        let contents = self.content_and_hash()?;

        let tmp_prefix = format!("{}.tmp-{}", self.file_prefix, unix_millis());
        new_provider.write_contents(&tmp_prefix, &contents)?;
        self.provider.clear(&self.file_prefix)?;
        new_provider.rename(&tmp_prefix, &self.file_prefix)?;
        self.provider = new_provider;

        // Durable content now reflects in-memory state exactly.
        let hashes: Vec<ContentHash> = contents.iter().map(|c| c.hash.clone()).collect();
        let data = self.data.as_mut().expect("state data loaded");
        if hashes.is_empty() {
            data.clear_hash();
        } else {
            data.set_hash(&ContentHash::combine(&hashes));
        }
        self.lifecycle.durable_synced();
        self.lifecycle.mark_cache_dirty();
        info!(
            workspace = %self.workspace_id,
            prefix = %self.file_prefix,
            "migrated state to new storage backend"
        );
        Ok(())
    }

    /// Reconfigure the storage backend from a state configuration.
    ///
    /// Building the new provider validates the configuration synchronously;
    /// nothing is read or written when it is invalid.
    pub fn update_config(&mut self, workspace_id: &str, config: &StateConfig) -> StateResult<()> {
        let new_provider = provider_from_config(workspace_id, config)?;
        self.migrate_to(new_provider)
    }
}

impl std::fmt::Debug for WorkspaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceState")
            .field("workspace_id", &self.workspace_id)
            .field("file_prefix", &self.file_prefix)
            .field("loaded", &self.data.is_some())
            .finish()
    }
}
