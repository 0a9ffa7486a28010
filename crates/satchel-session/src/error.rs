//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session is not live in the store.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// A live session already uses this id.
    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    /// Configuration rejected (e.g. a zero sweep interval).
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    /// Attribute value could not be converted to or from JSON.
    #[error("Attribute serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Table and recency list disagree.
    #[error("Store is inconsistent: {0}")]
    Inconsistent(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
