// src/storage/mod.rs

//! Content storage abstraction
//!
//! Storage paths are immutable once written: a second write of identical
//! bytes is a harmless duplicate, a write of different bytes is a
//! conflict and never overwrites. Backends report these outcomes through
//! [`PutResult`] instead of backend-specific errors.

mod filesystem;
mod package;

pub use filesystem::FileStorage;
pub use package::PackageStorage;

use crate::error::{Error, Result};
use async_trait::async_trait;
use url::Url;

/// Outcome of a storage write against an immutable path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    /// First write at this path
    Success,
    /// Identical content was already stored at this path
    AlreadyExists,
    /// Different content was already stored at this path; nothing was
    /// overwritten
    Conflict,
}

/// Addressable blob storage with conflict-aware writes
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Fetch the content at `path`, or `Error::BlobNotFound`
    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Write `content` at `path`, treating the path as immutable once
    /// written. The declared content type is advisory; backends that do
    /// not record it may ignore it.
    async fn put(&self, path: &str, content: &[u8], content_type: &str) -> Result<PutResult>;

    /// Delete the content at `path`. Deleting a missing path is a no-op.
    async fn delete(&self, path: &str) -> Result<()>;

    /// A URI from which the content at `path` can be downloaded
    async fn download_url(&self, path: &str) -> Result<Url>;
}

/// No-op storage backend, selected by configuration when the registry
/// runs without content storage.
pub struct NullStorage;

#[async_trait]
impl StorageService for NullStorage {
    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        Err(Error::BlobNotFound {
            path: path.to_string(),
        })
    }

    async fn put(&self, _path: &str, _content: &[u8], _content_type: &str) -> Result<PutResult> {
        Ok(PutResult::Success)
    }

    async fn delete(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("null:{path}")).map_err(|_| Error::InvalidPath {
            path: path.to_string(),
        })
    }
}
