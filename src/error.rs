// src/error.rs

//! Error types for the registry core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the registry core
#[derive(Error, Debug)]
pub enum Error {
    /// The uploaded archive is structurally malformed or misses mandatory
    /// manifest fields. Reported as a normal indexing outcome, never as a
    /// raw parse error.
    #[error("invalid package: {reason}")]
    InvalidPackage { reason: String },

    /// A version string could not be parsed
    #[error("invalid version '{value}'")]
    InvalidVersion { value: String },

    /// No content exists at the requested storage path
    #[error("no content stored at '{path}'")]
    BlobNotFound { path: String },

    /// A storage path escapes the store root or is otherwise unusable
    #[error("invalid storage path '{path}'")]
    InvalidPath { path: String },

    /// Different content already exists at an immutable storage path
    #[error("conflicting content already stored at '{path}'")]
    ContentConflict { path: String },

    /// The bounded optimistic retry on the download counter was exhausted
    #[error("download counter for {id} {version} still contended after {attempts} attempts")]
    DownloadCounterContention {
        id: String,
        version: String,
        attempts: u32,
    },

    /// A stored row holds a value the current code cannot interpret
    #[error("corrupt database record: {0}")]
    InvalidRecord(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON (de)serialization error for structured database columns
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Search index error
    #[error("search index error: {0}")]
    Search(#[from] tantivy::TantivyError),

    /// HTTP error while talking to the upstream feed
    #[error("upstream HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A background task panicked or was aborted
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Shorthand for an `InvalidPackage` error
    pub fn invalid_package(reason: impl Into<String>) -> Self {
        Error::InvalidPackage {
            reason: reason.into(),
        }
    }
}
