use crate::elem::{ElemId, Element};

/// A detailed change to apply to workspace state.
///
/// Produced by the fetch/deploy pipeline when reconciling fetched
/// configuration against the stored state. The state subsystem applies
/// changes without interpreting element semantics: additions and
/// modifications overwrite the stored element, removals delete it.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    /// A new element appeared.
    Add { element: Element },
    /// An existing element changed.
    Modify { before: Element, after: Element },
    /// An element disappeared.
    Remove { id: ElemId },
}

impl Change {
    /// The identifier of the element this change targets.
    pub fn target(&self) -> &ElemId {
        match self {
            Change::Add { element } => &element.id,
            Change::Modify { after, .. } => &after.id,
            Change::Remove { id } => id,
        }
    }

    /// The element the state should hold after this change, if any.
    pub fn applied_element(&self) -> Option<&Element> {
        match self {
            Change::Add { element } => Some(element),
            Change::Modify { after, .. } => Some(after),
            Change::Remove { .. } => None,
        }
    }

    /// Returns `true` for removals.
    pub fn is_removal(&self) -> bool {
        matches!(self, Change::Remove { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, label: &str) -> Element {
        Element::new(
            ElemId::from_full_name(name).unwrap(),
            serde_json::json!({ "label": label }),
        )
    }

    #[test]
    fn add_targets_the_new_element() {
        let change = Change::Add {
            element: element("salesforce.Lead", "Lead"),
        };
        assert_eq!(change.target().full_name(), "salesforce.Lead");
        assert!(change.applied_element().is_some());
        assert!(!change.is_removal());
    }

    #[test]
    fn modify_applies_the_after_side() {
        let change = Change::Modify {
            before: element("salesforce.Lead", "Lead"),
            after: element("salesforce.Lead", "Renamed"),
        };
        let applied = change.applied_element().unwrap();
        assert_eq!(applied.value["label"], "Renamed");
    }

    #[test]
    fn remove_applies_nothing() {
        let change = Change::Remove {
            id: ElemId::from_full_name("salesforce.Lead").unwrap(),
        };
        assert!(change.applied_element().is_none());
        assert!(change.is_removal());
    }
}
