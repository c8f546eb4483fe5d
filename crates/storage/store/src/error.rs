/// Result alias for [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by a [`Store`](crate::Store).
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A uniqueness or integrity rule rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Any other backend failure.
    #[error("store: {0}")]
    Other(String),
}

impl StoreError {
    /// Returns `true` if this is [`StoreError::NotFound`].
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is [`StoreError::Conflict`].
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
