//! Error types for backend operations

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend could not be reached
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Backend refused the request
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Requested unit or proof does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Deadline passed before the operation finished
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Operation cancelled
    #[error("Cancelled")]
    Cancelled,

    /// Selection, signing or verification failure
    #[error(transparent)]
    Core(#[from] alphabill_core::Error),
}

impl Error {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkUnavailable(_))
    }
}
