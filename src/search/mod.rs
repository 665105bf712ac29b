// src/search/mod.rs

//! Search index write contract
//!
//! The ingestion pipeline only ever writes to the search index; querying
//! and ranking belong to the host. Indexing the same `(id, version)`
//! again replaces its document, so an overwritten package is re-indexed
//! cleanly.

mod tantivy_index;

pub use tantivy_index::TantivySearchIndexer;

use crate::error::Result;
use crate::package::Package;
use async_trait::async_trait;

#[async_trait]
pub trait SearchIndexer: Send + Sync {
    /// Add or replace the document for this package version
    async fn index(&self, package: &Package) -> Result<()>;
}

/// No-op indexer, selected by configuration when search is disabled
pub struct NullSearchIndexer;

#[async_trait]
impl SearchIndexer for NullSearchIndexer {
    async fn index(&self, _package: &Package) -> Result<()> {
        Ok(())
    }
}
