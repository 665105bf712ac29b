// src/ingest/mod.rs

//! Package ingestion pipeline
//!
//! Ingestion is an ordered chain of steps, each receiving the mutable
//! indexing context and a continuation for the rest of the chain. A step
//! that does not invoke its continuation declines, and later steps never
//! run. Steps can be inserted, removed, or reordered without touching
//! the others; this is the crate's only extensibility seam.
//!
//! The default chain, in order: uniqueness pre-check, storage commit,
//! metadata commit, search indexing. Duplicate and conflict outcomes are
//! plain results; everything else propagates as a fatal error, and the
//! orchestrator never retries (transient retry belongs to the stores).

mod steps;

pub use steps::{MetadataStep, SearchStep, StorageStep, UniquenessStep};

use crate::db::PackageDatabase;
use crate::error::{Error, Result};
use crate::extract::extract_package;
use crate::package::Package;
use crate::search::SearchIndexer;
use crate::storage::PackageStorage;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one ingestion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingResult {
    Success,
    PackageAlreadyExists,
    InvalidPackage,
}

/// Mutable state threaded through the step chain
pub struct IndexingContext {
    pub package: Package,
    /// The raw archive, re-read from the start by the storage step
    pub archive: Vec<u8>,
    pub manifest: Vec<u8>,
    pub readme: Option<Vec<u8>>,
    pub icon: Option<Vec<u8>>,
    /// The accumulating outcome; a declining step rewrites this before
    /// short-circuiting
    pub result: IndexingResult,
}

/// One step of the ingestion chain
#[async_trait]
pub trait IndexingStep: Send + Sync {
    /// Inspect the context, then either call `next.run(ctx)` to continue
    /// the chain or return without doing so to short-circuit.
    async fn run(&self, ctx: &mut IndexingContext, next: Next<'_>) -> Result<()>;
}

/// Continuation over the remaining steps of the chain
pub struct Next<'a> {
    steps: &'a [Arc<dyn IndexingStep>],
}

impl<'a> Next<'a> {
    pub async fn run(self, ctx: &mut IndexingContext) -> Result<()> {
        match self.steps.split_first() {
            Some((step, rest)) => step.run(ctx, Next { steps: rest }).await,
            None => Ok(()),
        }
    }
}

/// Orchestrates extraction and the step chain for pushes and mirror
/// downloads alike.
pub struct PackageIngestor {
    steps: Vec<Arc<dyn IndexingStep>>,
}

impl PackageIngestor {
    /// Build an ingestor with a custom step chain
    pub fn new(steps: Vec<Arc<dyn IndexingStep>>) -> Self {
        Self { steps }
    }

    /// The standard chain: uniqueness, storage, metadata, search
    pub fn with_default_steps(
        db: Arc<dyn PackageDatabase>,
        storage: Arc<PackageStorage>,
        search: Arc<dyn SearchIndexer>,
        allow_overwrites: bool,
    ) -> Self {
        Self::new(vec![
            Arc::new(UniquenessStep::new(
                db.clone(),
                storage.clone(),
                allow_overwrites,
            )),
            Arc::new(StorageStep::new(storage)),
            Arc::new(MetadataStep::new(db)),
            Arc::new(SearchStep::new(search)),
        ])
    }

    /// Ingest one raw package archive.
    ///
    /// A malformed archive is detected before any step runs and reported
    /// as `InvalidPackage` with no side effects.
    pub async fn index(&self, archive: Vec<u8>) -> Result<IndexingResult> {
        let extracted = tokio::task::spawn_blocking(move || {
            let result = extract_package(&archive);
            (archive, result)
        })
        .await?;

        let (archive, extracted) = extracted;
        let extracted = match extracted {
            Ok(extracted) => extracted,
            Err(Error::InvalidPackage { reason }) => {
                warn!(%reason, "rejected invalid package archive");
                return Ok(IndexingResult::InvalidPackage);
            }
            Err(e) => return Err(e),
        };

        let id = extracted.package.id.clone();
        let version = extracted.package.version_normalized();
        info!(%id, %version, "ingesting package");

        let mut ctx = IndexingContext {
            package: extracted.package,
            archive,
            manifest: extracted.manifest,
            readme: extracted.readme,
            icon: extracted.icon,
            result: IndexingResult::Success,
        };

        Next { steps: &self.steps }.run(&mut ctx).await?;

        info!(%id, %version, result = ?ctx.result, "finished ingesting package");
        Ok(ctx.result)
    }
}
