//! Error types for aeromon-store.

use std::path::PathBuf;

/// Result type for aeromon-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in aeromon-store.
///
/// The store never raises network-related errors by construction; everything
/// here is local.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create the database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored date or timestamp failed to parse back.
    #[error("Invalid stored timestamp: {0}")]
    InvalidTimestamp(String),

    /// An in-memory store has no backing file to reopen.
    #[error("Cannot duplicate a connection to an in-memory store")]
    InMemoryNotDuplicable,
}
