use thiserror::Error;

/// Errors from workspace state operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// Failure in the durable content backend.
    #[error(transparent)]
    Store(#[from] tessera_store::StoreError),

    /// Failure while encoding or decoding the durable state stream.
    #[error(transparent)]
    Codec(#[from] tessera_codec::CodecError),

    /// A stored key could not be interpreted as an element identifier.
    #[error(transparent)]
    Types(#[from] tessera_types::TypeError),

    /// JSON conversion failure inside the quick-access cache.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure in the quick-access cache's backing store.
    #[error("state cache error: {0}")]
    Cache(String),
}

/// Result alias for state operations.
pub type StateResult<T> = Result<T, StateError>;
