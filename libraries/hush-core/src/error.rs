/// Core error types for Hush
use crate::types::SessionId;
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors returned by a `PersistenceStore`
pub type StoreError = CoreError;

/// Core error type for Hush collaborators
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session not found in the catalog
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Persistence layer failed to accept a write
    #[error("Store error: {0}")]
    Store(String),

    /// Catalog could not be read
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
