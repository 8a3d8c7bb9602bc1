//! Error types for krishimitra-store.

use std::path::PathBuf;

/// Result type for krishimitra-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in krishimitra-store.
///
/// Only writes surface errors, including records rejected by validation.
/// Reads that hit a backend failure or malformed data degrade to an empty
/// result and log a warning.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record failed validation and was not written.
    #[error("Invalid record under {0}")]
    InvalidRecord(String),

    /// A backend other than SQLite failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}
