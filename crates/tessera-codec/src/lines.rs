/// The known line kinds of the state stream, keyed by line index.
///
/// The dispatch table is open: indices outside the known set are routed to
/// a warn-and-skip default by the decoder, so future writers can append
/// lines without breaking old readers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateLineKind {
    /// Line 0: the serialized element array.
    Elements,
    /// Line 1: the account name (legacy: account-to-timestamp object).
    Accounts,
    /// Line 2: the path index.
    PathIndex,
    /// Line 3: legacy format version string. Parsed if present, ignored.
    Version,
}

impl StateLineKind {
    /// Map a line index to its kind. `None` for unrecognized indices.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Elements),
            1 => Some(Self::Accounts),
            2 => Some(Self::PathIndex),
            3 => Some(Self::Version),
            _ => None,
        }
    }

    /// The line index this kind occupies.
    pub const fn index(&self) -> usize {
        match self {
            Self::Elements => 0,
            Self::Accounts => 1,
            Self::PathIndex => 2,
            Self::Version => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_indices_roundtrip() {
        for index in 0..4 {
            let kind = StateLineKind::from_index(index).unwrap();
            assert_eq!(kind.index(), index);
        }
    }

    #[test]
    fn unknown_indices_are_none() {
        assert!(StateLineKind::from_index(4).is_none());
        assert!(StateLineKind::from_index(100).is_none());
    }
}
