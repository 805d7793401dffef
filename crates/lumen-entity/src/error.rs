use lumen_store::StoreError;

/// Errors from entity serialization, resolution, and persistence.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// A document is malformed, lacks a required field after defaulting,
    /// or carries a type tag its decoder does not know.
    #[error("schema error in {tag}: {reason}")]
    Schema { tag: String, reason: String },

    /// A referenced document or blob does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A store could not be reached. Never retried internally.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored channel was accessed on a record with no blob store attached.
    #[error("channel {0} is stored but no blob store is attached")]
    Detached(String),

    /// A well-formed entity was not of the type the caller asked for.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl EntityError {
    pub fn schema(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            tag: tag.into(),
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for EntityError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
            other => Self::Store(other),
        }
    }
}

/// Result alias for entity operations.
pub type EntityResult<T> = Result<T, EntityError>;
