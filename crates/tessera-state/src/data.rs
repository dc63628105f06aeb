//! The materialized quick-access view of one environment's state.

use tracing::warn;

use tessera_types::{ContentHash, ElemId, Element, PathIndex, SourcePath};

use crate::error::StateResult;
use crate::kv::{KvMap, MapCreator};

const ACCOUNT_NAMES_KEY: &str = "account_names";
const HASH_KEY: &str = "hash";
const VERSION_KEY: &str = "version";

/// The quick-access cache for one workspace environment: elements, path
/// index, account list, and metadata, each in its own namespaced map.
///
/// The recorded hash in `metadata` must equal the durable content's current
/// hash whenever this data is considered fresh; a mismatch is the sole
/// trigger for a full reparse.
pub struct StateData {
    elements: Box<dyn KvMap>,
    path_index: Box<dyn KvMap>,
    accounts: Box<dyn KvMap>,
    metadata: Box<dyn KvMap>,
}

impl StateData {
    /// Build the cache structure for an environment from a map creator.
    pub fn create(creator: &dyn MapCreator, env: &str) -> StateResult<Self> {
        Ok(Self {
            elements: creator.create(&format!("state-{env}-elements"))?,
            path_index: creator.create(&format!("state-{env}-pathindex"))?,
            accounts: creator.create(&format!("state-{env}-accounts"))?,
            metadata: creator.create(&format!("state-{env}-metadata"))?,
        })
    }

    // ---------------------------------------------------------------
    // Metadata
    // ---------------------------------------------------------------

    /// The content hash recorded at the last materialization, if any.
    ///
    /// An unparseable recorded hash reads as absent: the caller then treats
    /// the cache as stale and reparses, which self-heals the record.
    pub fn recorded_hash(&self) -> Option<ContentHash> {
        let value = self.metadata.get(HASH_KEY)?;
        let text = value.as_str()?;
        match ContentHash::from_hex(text) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(error = %e, "ignoring unparseable recorded state hash");
                None
            }
        }
    }

    pub fn set_hash(&mut self, hash: &ContentHash) {
        self.metadata
            .set(HASH_KEY, serde_json::Value::String(hash.as_str().to_string()));
    }

    pub fn clear_hash(&mut self) {
        self.metadata.delete(HASH_KEY);
    }

    /// The platform version that last wrote this cache.
    pub fn version(&self) -> Option<String> {
        self.metadata
            .get(VERSION_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn set_version(&mut self, version: &str) {
        self.metadata
            .set(VERSION_KEY, serde_json::Value::String(version.to_string()));
    }

    // ---------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------

    /// The account names represented in this state, sorted.
    pub fn accounts(&self) -> Vec<String> {
        let Some(value) = self.accounts.get(ACCOUNT_NAMES_KEY) else {
            return Vec::new();
        };
        let Some(items) = value.as_array() else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    }

    /// Replace the account list. Names are sorted and deduplicated.
    pub fn set_accounts(&mut self, mut names: Vec<String>) {
        names.sort();
        names.dedup();
        self.accounts
            .set(ACCOUNT_NAMES_KEY, serde_json::json!(names));
    }

    /// Add one account to the list if not already present.
    pub fn add_account(&mut self, name: &str) {
        let mut names = self.accounts();
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
            self.set_accounts(names);
        }
    }

    // ---------------------------------------------------------------
    // Elements
    // ---------------------------------------------------------------

    pub fn element(&self, id: &ElemId) -> Option<Element> {
        self.elements
            .get(id.full_name())
            .map(|value| Element::new(id.clone(), value))
    }

    pub fn has_element(&self, id: &ElemId) -> bool {
        self.elements.get(id.full_name()).is_some()
    }

    pub fn set_element(&mut self, element: &Element) {
        self.elements
            .set(element.id.full_name(), element.value.clone());
    }

    pub fn remove_element(&mut self, id: &ElemId) -> bool {
        self.elements.delete(id.full_name())
    }

    /// All element identifiers, sorted.
    pub fn element_ids(&self) -> StateResult<Vec<ElemId>> {
        self.elements
            .keys()
            .iter()
            .map(|key| ElemId::from_full_name(key).map_err(Into::into))
            .collect()
    }

    /// All elements, sorted by identifier.
    pub fn all_elements(&self) -> StateResult<Vec<Element>> {
        self.elements
            .keys()
            .iter()
            .map(|key| {
                let id = ElemId::from_full_name(key)?;
                let value = self.elements.get(key).unwrap_or(serde_json::Value::Null);
                Ok(Element::new(id, value))
            })
            .collect()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    // ---------------------------------------------------------------
    // Path index
    // ---------------------------------------------------------------

    /// Materialize the full path index.
    pub fn path_index(&self) -> StateResult<PathIndex> {
        let mut index = PathIndex::new();
        for key in self.path_index.keys() {
            let id = ElemId::from_full_name(&key)?;
            let Some(value) = self.path_index.get(&key) else {
                continue;
            };
            let paths: Vec<SourcePath> = serde_json::from_value(value)?;
            index.insert(id, paths);
        }
        Ok(index)
    }

    pub fn set_path_entry(&mut self, id: &ElemId, paths: &[SourcePath]) -> StateResult<()> {
        self.path_index
            .set(id.full_name(), serde_json::to_value(paths)?);
        Ok(())
    }

    pub fn remove_path_entry(&mut self, id: &ElemId) -> bool {
        self.path_index.delete(id.full_name())
    }

    /// Replace the whole path index.
    pub fn replace_path_index(&mut self, index: &PathIndex) -> StateResult<()> {
        self.path_index.clear();
        for (id, paths) in index.iter() {
            self.set_path_entry(id, paths)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Drop every map's contents, metadata included.
    pub fn clear_all(&mut self) {
        self.elements.clear();
        self.path_index.clear();
        self.accounts.clear();
        self.metadata.clear();
    }

    /// Persist every map's backing store. Returns `true` if any wrote.
    pub fn flush_all(&mut self) -> StateResult<bool> {
        let mut persisted = false;
        persisted |= self.elements.flush()?;
        persisted |= self.path_index.flush()?;
        persisted |= self.accounts.flush()?;
        persisted |= self.metadata.flush()?;
        Ok(persisted)
    }
}

impl std::fmt::Debug for StateData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateData")
            .field("elements", &self.elements.len())
            .field("accounts", &self.accounts())
            .field("hash", &self.recorded_hash())
            .finish()
    }
}
