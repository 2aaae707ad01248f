//! Error types

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value is malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Vault or key error from the wallet core
    #[error(transparent)]
    Core(#[from] alphabill_core::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
