// src/storage/filesystem.rs

//! On-disk content storage
//!
//! Stores blobs under a root directory. Writes use create-new semantics
//! so the first writer wins; a losing writer observes either
//! `AlreadyExists` (identical bytes) or `Conflict` (different bytes) by
//! comparing content digests, and never rewrites the existing file.

use crate::error::{Error, Result};
use crate::storage::{PutResult, StorageService};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Filesystem-backed [`StorageService`]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve a relative storage path against the root, rejecting
    /// anything that could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() {
            return Err(Error::InvalidPath {
                path: path.to_string(),
            });
        }

        let mut full = self.root.clone();
        for part in path.split('/') {
            if part.is_empty() || part == "." || part == ".." || part.contains('\\') {
                return Err(Error::InvalidPath {
                    path: path.to_string(),
                });
            }
            full.push(part);
        }
        Ok(full)
    }
}

fn digest(content: &[u8]) -> [u8; 32] {
    Sha256::digest(content).into()
}

#[async_trait]
impl StorageService for FileStorage {
    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::BlobNotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, path: &str, content: &[u8], _content_type: &str) -> Result<PutResult> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let open = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await;

        match open {
            Ok(mut file) => {
                file.write_all(content).await?;
                file.flush().await?;
                Ok(PutResult::Success)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let existing = tokio::fs::read(&full).await?;
                if digest(&existing) == digest(content) {
                    Ok(PutResult::AlreadyExists)
                } else {
                    Ok(PutResult::Conflict)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn download_url(&self, path: &str) -> Result<Url> {
        let full = self.resolve(path)?;
        Url::from_file_path(&full).map_err(|_| Error::InvalidPath {
            path: path.to_string(),
        })
    }
}
