use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed state line {index}: {reason}")]
    MalformedLine { index: usize, reason: String },

    #[error("invalid element identifier in state stream: {0}")]
    InvalidIdentifier(#[from] tessera_types::TypeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;
