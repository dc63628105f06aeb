use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Globally unique hierarchical identifier for a configuration element.
///
/// An `ElemId` is a dot-separated path: the first segment names the account
/// (the adapter instance the element was fetched from), subsequent segments
/// descend into the element hierarchy, e.g.
/// `salesforce.Lead.field.Status`. Identifiers are string-comparable: the
/// full name is the canonical form and defines ordering.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElemId(String);

impl ElemId {
    /// Parse an identifier from its canonical dot-separated full name.
    ///
    /// The name must be non-empty and contain no empty segments.
    pub fn from_full_name(name: &str) -> Result<Self, TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidElemId(
                name.to_string(),
                "empty name".to_string(),
            ));
        }
        if name.split('.').any(str::is_empty) {
            return Err(TypeError::InvalidElemId(
                name.to_string(),
                "empty segment".to_string(),
            ));
        }
        Ok(Self(name.to_string()))
    }

    /// Build an identifier from individual segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(".");
        Self::from_full_name(&joined)
    }

    /// The canonical full name.
    pub fn full_name(&self) -> &str {
        &self.0
    }

    /// The account (first segment) that owns this element.
    pub fn account(&self) -> &str {
        match self.0.split_once('.') {
            Some((account, _)) => account,
            None => &self.0,
        }
    }

    /// Iterate over the identifier's segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Debug for ElemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElemId({})", self.0)
    }
}

impl fmt::Display for ElemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One configuration element: an identifier plus its serialized value.
///
/// The state subsystem never interprets the value: it is carried as opaque
/// structured data and compared only for equality.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElemId,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Element {
    /// Create an element from an identifier and its value.
    pub fn new(id: ElemId, value: serde_json::Value) -> Self {
        Self { id, value }
    }

    /// The account this element belongs to.
    pub fn account(&self) -> &str {
        self.id.account()
    }
}
