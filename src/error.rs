//! Error types for the namespace store.

use thiserror::Error;

/// Main error type for store and bubbler operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    #[error("Invalid key: {0:?} (keys may not start with '/')")]
    InvalidKey(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Listener failed: {0}")]
    Listener(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// True if this is a path resolution failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
