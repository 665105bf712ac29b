// src/db/mod.rs

//! Metadata database abstraction
//!
//! The metadata store is the source of truth for package existence. Its
//! uniqueness constraint on `(lowercase id, normalized version)` is the
//! canonical dedup point for concurrent pushes: a losing writer observes
//! `PackageAlreadyExists` instead of an error.

mod sqlite;

pub use sqlite::SqliteDatabase;

use crate::error::Result;
use crate::package::Package;
use crate::version::PackageVersion;
use async_trait::async_trait;

/// Outcome of inserting a package row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAddResult {
    Success,
    /// The uniqueness constraint on (id, version) was violated
    PackageAlreadyExists,
}

#[async_trait]
pub trait PackageDatabase: Send + Sync {
    /// Insert a new package row. A uniqueness violation is reported as
    /// `PackageAlreadyExists`, never as an error.
    async fn add(&self, package: &Package) -> Result<PackageAddResult>;

    /// Whether any version of `id` exists (including unlisted)
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Whether the exact `(id, version)` exists (including unlisted)
    async fn version_exists(&self, id: &str, version: &PackageVersion) -> Result<bool>;

    /// All versions of `id`; unlisted rows are excluded unless requested
    async fn find(&self, id: &str, include_unlisted: bool) -> Result<Vec<Package>>;

    /// The exact `(id, version)` row, or `None`
    async fn find_or_null(
        &self,
        id: &str,
        version: &PackageVersion,
        include_unlisted: bool,
    ) -> Result<Option<Package>>;

    /// Soft-remove: flips `listed` off. Returns false if no matching row.
    async fn unlist(&self, id: &str, version: &PackageVersion) -> Result<bool>;

    /// Reverses an unlist. Returns false if no matching row.
    async fn relist(&self, id: &str, version: &PackageVersion) -> Result<bool>;

    /// Increment the download counter under optimistic concurrency,
    /// retrying transient conflicts internally up to a fixed bound.
    /// Missing rows are a no-op.
    async fn add_download(&self, id: &str, version: &PackageVersion) -> Result<()>;

    /// Remove the row. Returns whether a row was found; false is not an
    /// error, since the caller may still need to clean up storage.
    async fn hard_delete(&self, id: &str, version: &PackageVersion) -> Result<bool>;
}
