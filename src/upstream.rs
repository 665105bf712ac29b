// src/upstream.rs

//! Upstream feed client
//!
//! Read-only access to a remote registry for mirror-on-miss. The wire
//! layout mirrors keel's own storage path scheme, so any keel storage
//! tree served over HTTP is a valid upstream:
//!
//! ```text
//! GET {base}/{lowercase id}/index.json            -> {"versions": [...]}
//! GET {base}/{lid}/{lver}/manifest.toml           -> package manifest
//! GET {base}/{lid}/{lver}/{lid}.{lver}.pkg        -> package archive
//! ```

use crate::error::Result;
use crate::extract::Manifest;
use crate::package::Package;
use crate::storage::PackageStorage;
use crate::version::PackageVersion;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for upstream requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only client against a remote registry
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// All versions of `id` known upstream; empty when unknown
    async fn list_package_versions(&self, id: &str) -> Result<Vec<PackageVersion>>;

    /// All package records of `id` known upstream; empty when unknown
    async fn list_packages(&self, id: &str) -> Result<Vec<Package>>;

    /// The raw archive for `(id, version)`, or `None` if the upstream
    /// does not have it
    async fn download_package_or_null(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Deserialize)]
struct VersionIndex {
    versions: Vec<String>,
}

/// HTTP implementation of [`UpstreamClient`]
pub struct HttpUpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstreamClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, HTTP_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// GET a path, mapping 404 to `None`
    async fn get_or_null(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let url = self.url(path);
        debug!(%url, "fetching from upstream");

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response.error_for_status()?;
        Ok(Some(response.bytes().await?.to_vec()))
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn list_package_versions(&self, id: &str) -> Result<Vec<PackageVersion>> {
        let path = format!("{}/index.json", id.to_lowercase());
        let body = match self.get_or_null(&path).await? {
            Some(body) => body,
            None => return Ok(Vec::new()),
        };

        let index: VersionIndex = serde_json::from_slice(&body)?;
        let mut versions = Vec::with_capacity(index.versions.len());
        for raw in index.versions {
            match PackageVersion::parse(&raw) {
                Ok(version) => versions.push(version),
                Err(_) => warn!(id, %raw, "skipping unparseable upstream version"),
            }
        }
        Ok(versions)
    }

    async fn list_packages(&self, id: &str) -> Result<Vec<Package>> {
        let versions = self.list_package_versions(id).await?;

        let mut packages = Vec::with_capacity(versions.len());
        for version in versions {
            let path = PackageStorage::manifest_path(id, &version.normalized());
            let manifest = match self.get_or_null(&path).await? {
                Some(bytes) => bytes,
                None => {
                    warn!(id, version = %version, "upstream lists version without manifest");
                    continue;
                }
            };

            match Manifest::parse(&manifest).and_then(Manifest::into_package) {
                Ok(package) => packages.push(package),
                Err(e) => warn!(id, version = %version, error = %e, "skipping bad upstream manifest"),
            }
        }
        Ok(packages)
    }

    async fn download_package_or_null(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> Result<Option<Vec<u8>>> {
        let path = PackageStorage::archive_path(id, &version.normalized());
        self.get_or_null(&path).await
    }
}

/// Null-object upstream for registries that do not mirror: nothing is
/// ever found remotely.
pub struct DisabledUpstreamClient;

#[async_trait]
impl UpstreamClient for DisabledUpstreamClient {
    async fn list_package_versions(&self, _id: &str) -> Result<Vec<PackageVersion>> {
        Ok(Vec::new())
    }

    async fn list_packages(&self, _id: &str) -> Result<Vec<Package>> {
        Ok(Vec::new())
    }

    async fn download_package_or_null(
        &self,
        _id: &str,
        _version: &PackageVersion,
    ) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}
