use thiserror::Error;

/// Errors from state content provider operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend itself is unreachable (not "no files yet", which is a
    /// valid empty result).
    #[error("state storage not found: {0}")]
    NotFound(String),

    /// Missing or invalid backend configuration. Raised synchronously,
    /// before any I/O.
    #[error("invalid state configuration: {0}")]
    Configuration(String),

    /// A failure reported by the remote storage backend.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
