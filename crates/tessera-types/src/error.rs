use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid element id `{0}`: {1}")]
    InvalidElemId(String, String),

    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
