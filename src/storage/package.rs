// src/storage/package.rs

//! Package content addressing
//!
//! Maps a package to its deterministic artifact paths and orchestrates
//! multi-artifact puts, gets, and deletes against the content store. The
//! path scheme is part of the wire contract:
//!
//! ```text
//! {lowercase id}/{lowercase normalized version}/{id}.{version}.pkg
//! {lowercase id}/{lowercase normalized version}/manifest.toml
//! {lowercase id}/{lowercase normalized version}/readme.md
//! {lowercase id}/{lowercase normalized version}/icon
//! ```

use crate::error::{Error, Result};
use crate::package::Package;
use crate::storage::{PutResult, StorageService};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// File extension of the primary archive artifact
pub const ARCHIVE_EXTENSION: &str = "pkg";

const ARCHIVE_CONTENT_TYPE: &str = "binary/octet-stream";
const MANIFEST_CONTENT_TYPE: &str = "application/toml";
const README_CONTENT_TYPE: &str = "text/markdown";
const ICON_CONTENT_TYPE: &str = "application/octet-stream";

/// Stores package content. Package state lives in the metadata database,
/// not here.
pub struct PackageStorage {
    storage: Arc<dyn StorageService>,
}

impl PackageStorage {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    pub fn archive_path(id: &str, version: &str) -> String {
        let id = id.to_lowercase();
        let version = version.to_lowercase();
        format!("{id}/{version}/{id}.{version}.{ARCHIVE_EXTENSION}")
    }

    pub fn manifest_path(id: &str, version: &str) -> String {
        format!("{}/{}/manifest.toml", id.to_lowercase(), version.to_lowercase())
    }

    pub fn readme_path(id: &str, version: &str) -> String {
        format!("{}/{}/readme.md", id.to_lowercase(), version.to_lowercase())
    }

    pub fn icon_path(id: &str, version: &str) -> String {
        format!("{}/{}/icon", id.to_lowercase(), version.to_lowercase())
    }

    /// Persist a package's artifacts. Re-storing identical content is a
    /// harmless duplicate; different content at any artifact path aborts
    /// with `Error::ContentConflict` and never overwrites.
    pub async fn save_content(
        &self,
        package: &Package,
        archive: &[u8],
        manifest: &[u8],
        readme: Option<&[u8]>,
        icon: Option<&[u8]>,
    ) -> Result<()> {
        let id = package.id_lowercase();
        let version = package.version_normalized();

        info!(%id, %version, "storing package content");

        self.put(&Self::archive_path(&id, &version), archive, ARCHIVE_CONTENT_TYPE)
            .await?;
        self.put(&Self::manifest_path(&id, &version), manifest, MANIFEST_CONTENT_TYPE)
            .await?;

        if let Some(readme) = readme {
            self.put(&Self::readme_path(&id, &version), readme, README_CONTENT_TYPE)
                .await?;
        }
        if let Some(icon) = icon {
            self.put(&Self::icon_path(&id, &version), icon, ICON_CONTENT_TYPE)
                .await?;
        }

        Ok(())
    }

    async fn put(&self, path: &str, content: &[u8], content_type: &str) -> Result<()> {
        match self.storage.put(path, content, content_type).await? {
            PutResult::Success => Ok(()),
            PutResult::AlreadyExists => {
                debug!(path, "identical content already stored");
                Ok(())
            }
            PutResult::Conflict => Err(Error::ContentConflict {
                path: path.to_string(),
            }),
        }
    }

    pub async fn get_archive(&self, id: &str, version: &str) -> Result<Vec<u8>> {
        self.storage.get(&Self::archive_path(id, version)).await
    }

    pub async fn get_manifest(&self, id: &str, version: &str) -> Result<Vec<u8>> {
        self.storage.get(&Self::manifest_path(id, version)).await
    }

    pub async fn get_readme(&self, id: &str, version: &str) -> Result<Vec<u8>> {
        self.storage.get(&Self::readme_path(id, version)).await
    }

    pub async fn get_icon(&self, id: &str, version: &str) -> Result<Vec<u8>> {
        self.storage.get(&Self::icon_path(id, version)).await
    }

    pub async fn archive_url(&self, id: &str, version: &str) -> Result<Url> {
        self.storage
            .download_url(&Self::archive_path(id, version))
            .await
    }

    /// Remove every artifact of a package version. Each delete is
    /// idempotent, so this also cleans up after partial prior writes.
    pub async fn delete_content(&self, id: &str, version: &str) -> Result<()> {
        self.storage.delete(&Self::archive_path(id, version)).await?;
        self.storage.delete(&Self::manifest_path(id, version)).await?;
        self.storage.delete(&Self::readme_path(id, version)).await?;
        self.storage.delete(&Self::icon_path(id, version)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_scheme_is_lowercased() {
        assert_eq!(
            PackageStorage::archive_path("Foo.Bar", "1.0.0-BETA"),
            "foo.bar/1.0.0-beta/foo.bar.1.0.0-beta.pkg"
        );
        assert_eq!(
            PackageStorage::manifest_path("Foo.Bar", "1.0.0"),
            "foo.bar/1.0.0/manifest.toml"
        );
        assert_eq!(PackageStorage::readme_path("A", "2.0.0"), "a/2.0.0/readme.md");
        assert_eq!(PackageStorage::icon_path("A", "2.0.0"), "a/2.0.0/icon");
    }
}
