// src/registry.rs

//! Explicit component wiring
//!
//! Every component receives exactly the collaborators it depends on
//! through its constructor; there is no runtime service lookup. Null
//! backends (storage, search, upstream) are selected here from the
//! configuration.

use crate::config::RegistryConfig;
use crate::db::{PackageDatabase, SqliteDatabase};
use crate::delete::PackageDeletionService;
use crate::error::Result;
use crate::ingest::{IndexingResult, PackageIngestor};
use crate::search::{NullSearchIndexer, SearchIndexer, TantivySearchIndexer};
use crate::service::PackageService;
use crate::storage::{FileStorage, NullStorage, PackageStorage, StorageService};
use crate::upstream::{DisabledUpstreamClient, HttpUpstreamClient, UpstreamClient};
use crate::version::PackageVersion;
use std::sync::Arc;
use std::time::Duration;

/// A fully wired registry core
pub struct Registry {
    pub db: Arc<dyn PackageDatabase>,
    pub storage: Arc<PackageStorage>,
    pub search: Arc<dyn SearchIndexer>,
    pub upstream: Arc<dyn UpstreamClient>,
    pub ingestor: Arc<PackageIngestor>,
    pub packages: PackageService,
    pub deletion: PackageDeletionService,
}

impl Registry {
    pub fn open(config: &RegistryConfig) -> Result<Self> {
        let backend: Arc<dyn StorageService> = match &config.storage_path {
            Some(path) => Arc::new(FileStorage::new(path)?),
            None => Arc::new(NullStorage),
        };
        let storage = Arc::new(PackageStorage::new(backend));

        let db: Arc<dyn PackageDatabase> = Arc::new(SqliteDatabase::open(&config.database_path)?);

        let search: Arc<dyn SearchIndexer> = match &config.search_path {
            Some(path) => Arc::new(TantivySearchIndexer::open(path)?),
            None => Arc::new(NullSearchIndexer),
        };

        let upstream: Arc<dyn UpstreamClient> = match &config.upstream_url {
            Some(url) => Arc::new(HttpUpstreamClient::with_timeout(
                url,
                Duration::from_secs(config.upstream_timeout_secs),
            )?),
            None => Arc::new(DisabledUpstreamClient),
        };

        let ingestor = Arc::new(PackageIngestor::with_default_steps(
            db.clone(),
            storage.clone(),
            search.clone(),
            config.allow_package_overwrites,
        ));

        let packages = PackageService::new(db.clone(), upstream.clone(), ingestor.clone());
        let deletion =
            PackageDeletionService::new(db.clone(), storage.clone(), config.deletion_behavior);

        Ok(Self {
            db,
            storage,
            search,
            upstream,
            ingestor,
            packages,
            deletion,
        })
    }

    /// Push a raw package archive through the ingestion pipeline
    pub async fn push(&self, archive: Vec<u8>) -> Result<IndexingResult> {
        self.ingestor.index(archive).await
    }

    /// Delete a package under the configured deletion policy
    pub async fn delete(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        self.deletion.try_delete(id, version).await
    }
}
