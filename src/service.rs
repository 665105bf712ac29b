// src/service.rs

//! Read path with mirror-on-miss
//!
//! A missing local package is treated as a cache-miss against the
//! upstream feed: the archive is downloaded and pushed through the same
//! ingestion pipeline as a direct push. Upstream failures degrade to
//! "package not found", never to a service error.

use crate::db::PackageDatabase;
use crate::error::Result;
use crate::ingest::{IndexingResult, PackageIngestor};
use crate::package::Package;
use crate::upstream::UpstreamClient;
use crate::version::PackageVersion;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The client-facing read surface of the registry
pub struct PackageService {
    db: Arc<dyn PackageDatabase>,
    upstream: Arc<dyn UpstreamClient>,
    ingestor: Arc<PackageIngestor>,
}

impl PackageService {
    pub fn new(
        db: Arc<dyn PackageDatabase>,
        upstream: Arc<dyn UpstreamClient>,
        ingestor: Arc<PackageIngestor>,
    ) -> Self {
        Self {
            db,
            upstream,
            ingestor,
        }
    }

    /// All known versions of `id`: local and upstream merged, deduped on
    /// the normalized form. Upstream listing failures degrade to the
    /// local view.
    pub async fn find_package_versions(&self, id: &str) -> Result<Vec<PackageVersion>> {
        let upstream = match self.upstream.list_package_versions(id).await {
            Ok(versions) => versions,
            Err(e) => {
                warn!(id, error = %e, "upstream version listing failed, using local only");
                Vec::new()
            }
        };

        let local = self.db.find(id, true).await?;

        let mut merged: BTreeMap<String, PackageVersion> = BTreeMap::new();
        for version in upstream {
            merged.insert(version.normalized(), version);
        }
        for package in local {
            merged.insert(package.version_normalized(), package.version);
        }

        let mut versions: Vec<PackageVersion> = merged.into_values().collect();
        versions.sort();
        Ok(versions)
    }

    /// All known package records of `id`. On a version collision the
    /// local record shadows the upstream one: a locally re-indexed or
    /// overwritten version wins.
    pub async fn find_packages(&self, id: &str) -> Result<Vec<Package>> {
        let upstream = match self.upstream.list_packages(id).await {
            Ok(packages) => packages,
            Err(e) => {
                warn!(id, error = %e, "upstream package listing failed, using local only");
                Vec::new()
            }
        };

        let local = self.db.find(id, true).await?;

        let mut merged: BTreeMap<String, Package> = BTreeMap::new();
        for package in upstream {
            merged.insert(package.version_normalized(), package);
        }
        for package in local {
            merged.insert(package.version_normalized(), package);
        }

        let mut packages: Vec<Package> = merged.into_values().collect();
        packages.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(packages)
    }

    /// The exact package record, mirroring it from upstream first if it
    /// is missing locally
    pub async fn find_package_or_null(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> Result<Option<Package>> {
        if !self.mirror_if_missing(id, version).await? {
            return Ok(None);
        }

        self.db.find_or_null(id, version, true).await
    }

    /// Whether the package exists locally or could be mirrored
    pub async fn exists(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        self.mirror_if_missing(id, version).await
    }

    /// Count one download of `(id, version)`
    pub async fn add_download(&self, id: &str, version: &PackageVersion) -> Result<()> {
        self.db.add_download(id, version).await
    }

    /// Index the package from the upstream feed if it does not exist
    /// locally. Returns true if the package exists locally afterwards.
    ///
    /// The local existence check is mandatory: a hit must not cost an
    /// upstream round-trip on every read.
    async fn mirror_if_missing(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        if self.db.version_exists(id, version).await? {
            return Ok(true);
        }

        info!(id, version = %version, "package missing locally, checking upstream feed");

        let archive = match self.upstream.download_package_or_null(id, version).await {
            Ok(Some(archive)) => archive,
            Ok(None) => {
                warn!(id, version = %version, "upstream feed does not have the package");
                return Ok(false);
            }
            // An upstream outage degrades to a cache-miss, not an error.
            Err(e) => {
                error!(id, version = %version, error = %e, "upstream download failed");
                return Ok(false);
            }
        };

        info!(id, version = %version, "downloaded package from upstream, ingesting");

        match self.ingestor.index(archive).await {
            Ok(IndexingResult::Success) => Ok(true),
            Ok(result) => {
                warn!(id, version = %version, ?result, "mirror ingestion did not succeed");
                Ok(false)
            }
            Err(e) => {
                error!(id, version = %version, error = %e, "mirror ingestion failed");
                Ok(false)
            }
        }
    }
}
