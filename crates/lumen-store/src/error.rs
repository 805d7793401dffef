/// Errors from document and blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested document or blob does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store could not be reached or is unusable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a filesystem backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data failed an integrity check.
    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}
