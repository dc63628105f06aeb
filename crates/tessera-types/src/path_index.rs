use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::elem::ElemId;

/// One source fragment path: the ordered segments of a logical file path.
pub type SourcePath = Vec<String>;

/// Wire form of one path index entry: `[full_name, [[segment, ...], ...]]`.
///
/// Serialized as a two-element JSON array, matching the durable state format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathIndexEntry(pub String, pub Vec<SourcePath>);

/// Mapping from element identifier to the source fragment paths the element
/// originated from.
///
/// One element may be split across several source fragments; the paths are
/// kept in their original order so changes can be routed back to the right
/// fragment. Entries are held sorted by identifier so serialization is
/// reproducible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathIndex {
    entries: BTreeMap<ElemId, Vec<SourcePath>>,
}

impl PathIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed elements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no elements are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record the source paths for an element, replacing any existing entry.
    pub fn insert(&mut self, id: ElemId, paths: Vec<SourcePath>) {
        self.entries.insert(id, paths);
    }

    /// The source paths recorded for an element.
    pub fn get(&self, id: &ElemId) -> Option<&[SourcePath]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    /// Remove an element's entry. Returns `true` if it existed.
    pub fn remove(&mut self, id: &ElemId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Iterate entries sorted by element identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&ElemId, &Vec<SourcePath>)> {
        self.entries.iter()
    }

    /// The subset of entries belonging to one account.
    pub fn for_account(&self, account: &str) -> PathIndex {
        let entries = self
            .entries
            .iter()
            .filter(|(id, _)| id.account() == account)
            .map(|(id, paths)| (id.clone(), paths.clone()))
            .collect();
        PathIndex { entries }
    }

    /// Merge another index into this one, replacing on identifier collision.
    pub fn merge(&mut self, other: PathIndex) {
        self.entries.extend(other.entries);
    }

    /// Convert to wire entries, sorted by identifier.
    pub fn to_entries(&self) -> Vec<PathIndexEntry> {
        self.entries
            .iter()
            .map(|(id, paths)| PathIndexEntry(id.full_name().to_string(), paths.clone()))
            .collect()
    }

    /// Rebuild from wire entries. Entries with invalid identifiers are
    /// dropped by the caller's validation; this function assumes valid names.
    pub fn from_entries(entries: Vec<PathIndexEntry>) -> Result<Self, crate::TypeError> {
        let mut index = PathIndex::new();
        for PathIndexEntry(name, paths) in entries {
            index.insert(ElemId::from_full_name(&name)?, paths);
        }
        Ok(index)
    }
}

impl FromIterator<(ElemId, Vec<SourcePath>)> for PathIndex {
    fn from_iter<I: IntoIterator<Item = (ElemId, Vec<SourcePath>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ElemId {
        ElemId::from_full_name(name).unwrap()
    }

    fn path(segments: &[&str]) -> SourcePath {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn insert_get_remove() {
        let mut index = PathIndex::new();
        let lead = id("salesforce.Lead");
        index.insert(lead.clone(), vec![path(&["salesforce", "Objects", "Lead"])]);

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&lead).unwrap().len(), 1);
        assert!(index.remove(&lead));
        assert!(!index.remove(&lead));
        assert!(index.is_empty());
    }

    #[test]
    fn multiple_paths_keep_order() {
        let mut index = PathIndex::new();
        let lead = id("salesforce.Lead");
        index.insert(
            lead.clone(),
            vec![
                path(&["salesforce", "Objects", "Lead"]),
                path(&["salesforce", "Layouts", "Lead"]),
            ],
        );
        let paths = index.get(&lead).unwrap();
        assert_eq!(paths[0][1], "Objects");
        assert_eq!(paths[1][1], "Layouts");
    }

    #[test]
    fn for_account_filters() {
        let mut index = PathIndex::new();
        index.insert(id("salesforce.Lead"), vec![path(&["a"])]);
        index.insert(id("zendesk.Ticket"), vec![path(&["b"])]);

        let sf = index.for_account("salesforce");
        assert_eq!(sf.len(), 1);
        assert!(sf.get(&id("salesforce.Lead")).is_some());
        assert!(sf.get(&id("zendesk.Ticket")).is_none());
    }

    #[test]
    fn wire_entries_roundtrip() {
        let mut index = PathIndex::new();
        index.insert(id("zendesk.Ticket"), vec![path(&["zendesk", "Ticket"])]);
        index.insert(id("salesforce.Lead"), vec![path(&["salesforce", "Lead"])]);

        let entries = index.to_entries();
        // Sorted by identifier.
        assert_eq!(entries[0].0, "salesforce.Lead");

        let back = PathIndex::from_entries(entries).unwrap();
        assert_eq!(back, index);
    }

    #[test]
    fn wire_entry_serializes_as_nested_arrays() {
        let entry = PathIndexEntry(
            "salesforce.Lead".to_string(),
            vec![path(&["salesforce", "Lead"])],
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"["salesforce.Lead",[["salesforce","Lead"]]]"#);
    }

    #[test]
    fn merge_replaces_on_collision() {
        let mut left = PathIndex::new();
        left.insert(id("salesforce.Lead"), vec![path(&["old"])]);

        let mut right = PathIndex::new();
        right.insert(id("salesforce.Lead"), vec![path(&["new"])]);
        right.insert(id("zendesk.Ticket"), vec![path(&["t"])]);

        left.merge(right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.get(&id("salesforce.Lead")).unwrap()[0][0], "new");
    }
}
