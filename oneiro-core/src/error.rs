//! Error types for oneiro-core

use thiserror::Error;

/// Main error type for the oneiro-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Journal not found
    #[error("journal not found: {0}")]
    JournalNotFound(String),

    /// Dream record not found
    #[error("dream not found: {0}")]
    DreamNotFound(i64),

    /// Backup file rejected before import
    #[error("invalid backup file: {0}")]
    InvalidBackup(String),
}

/// Result type alias for oneiro-core
pub type Result<T> = std::result::Result<T, Error>;
