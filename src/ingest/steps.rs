// src/ingest/steps.rs

//! The standard ingestion steps

use crate::db::{PackageAddResult, PackageDatabase};
use crate::error::Result;
use crate::ingest::{IndexingContext, IndexingResult, IndexingStep, Next};
use crate::search::SearchIndexer;
use crate::storage::PackageStorage;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Ensures the package is new before anything is written.
///
/// Runs before storage, database, and search. When overwrites are
/// allowed, an existing package is purged from both the database and
/// storage first; otherwise the chain short-circuits with
/// `PackageAlreadyExists`.
pub struct UniquenessStep {
    db: Arc<dyn PackageDatabase>,
    storage: Arc<PackageStorage>,
    allow_overwrites: bool,
}

impl UniquenessStep {
    pub fn new(
        db: Arc<dyn PackageDatabase>,
        storage: Arc<PackageStorage>,
        allow_overwrites: bool,
    ) -> Self {
        Self {
            db,
            storage,
            allow_overwrites,
        }
    }
}

#[async_trait]
impl IndexingStep for UniquenessStep {
    async fn run(&self, ctx: &mut IndexingContext, next: Next<'_>) -> Result<()> {
        let id = ctx.package.id.clone();
        let version = ctx.package.version.clone();

        if self.db.version_exists(&id, &version).await? {
            if !self.allow_overwrites {
                warn!(
                    %id,
                    %version,
                    "package already exists and overwrites are disabled"
                );
                ctx.result = IndexingResult::PackageAlreadyExists;
                return Ok(());
            }

            info!(%id, %version, "overwriting existing package");
            self.db.hard_delete(&id, &version).await?;
            self.storage
                .delete_content(&id, &version.normalized())
                .await?;
        }

        next.run(ctx).await
    }
}

/// Commits the package content to storage.
///
/// Conflicting content at an existing path is not a transient condition;
/// it aborts the chain as a fatal error and is never retried.
pub struct StorageStep {
    storage: Arc<PackageStorage>,
}

impl StorageStep {
    pub fn new(storage: Arc<PackageStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl IndexingStep for StorageStep {
    async fn run(&self, ctx: &mut IndexingContext, next: Next<'_>) -> Result<()> {
        self.storage
            .save_content(
                &ctx.package,
                &ctx.archive,
                &ctx.manifest,
                ctx.readme.as_deref(),
                ctx.icon.as_deref(),
            )
            .await?;

        next.run(ctx).await
    }
}

/// Commits the package row to the metadata database.
///
/// `PackageAlreadyExists` here means a concurrent push won the race
/// after the uniqueness pre-check; the step declines cleanly instead of
/// erroring.
pub struct MetadataStep {
    db: Arc<dyn PackageDatabase>,
}

impl MetadataStep {
    pub fn new(db: Arc<dyn PackageDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IndexingStep for MetadataStep {
    async fn run(&self, ctx: &mut IndexingContext, next: Next<'_>) -> Result<()> {
        match self.db.add(&ctx.package).await? {
            PackageAddResult::Success => next.run(ctx).await,
            PackageAddResult::PackageAlreadyExists => {
                warn!(
                    id = %ctx.package.id,
                    version = %ctx.package.version,
                    "package metadata already exists, lost a concurrent push race"
                );
                ctx.result = IndexingResult::PackageAlreadyExists;
                Ok(())
            }
        }
    }
}

/// Notifies the search index about the new package
pub struct SearchStep {
    search: Arc<dyn SearchIndexer>,
}

impl SearchStep {
    pub fn new(search: Arc<dyn SearchIndexer>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl IndexingStep for SearchStep {
    async fn run(&self, ctx: &mut IndexingContext, next: Next<'_>) -> Result<()> {
        self.search.index(&ctx.package).await?;
        next.run(ctx).await
    }
}
