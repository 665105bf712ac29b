// src/search/tantivy_index.rs

//! Embedded tantivy search index

use crate::error::Result;
use crate::package::Package;
use crate::search::SearchIndexer;
use async_trait::async_trait;
use std::path::Path;
use tantivy::directory::MmapDirectory;
use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexWriter, TantivyError, Term};
use tracing::debug;

/// Write-side of the embedded full-text index. Documents are keyed by
/// `{lowercase id}:{normalized version}` so re-indexing a version
/// replaces its previous document.
pub struct TantivySearchIndexer {
    writer: tokio::sync::Mutex<IndexWriter>,
    key: Field,
    id: Field,
    description: Field,
    summary: Field,
    tags: Field,
    authors: Field,
}

impl TantivySearchIndexer {
    /// Open (or create) the index under `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let mut builder = Schema::builder();
        let key = builder.add_text_field("key", STRING | STORED);
        let id = builder.add_text_field("id", TEXT | STORED);
        let description = builder.add_text_field("description", TEXT);
        let summary = builder.add_text_field("summary", TEXT);
        let tags = builder.add_text_field("tags", TEXT);
        let authors = builder.add_text_field("authors", TEXT);
        let schema = builder.build();

        let directory = MmapDirectory::open(path).map_err(TantivyError::from)?;
        let index = Index::open_or_create(directory, schema)?;
        let writer = index.writer(50_000_000)?;

        Ok(Self {
            writer: tokio::sync::Mutex::new(writer),
            key,
            id,
            description,
            summary,
            tags,
            authors,
        })
    }

    fn document_key(package: &Package) -> String {
        format!(
            "{}:{}",
            package.id_lowercase(),
            package.version_normalized()
        )
    }
}

#[async_trait]
impl SearchIndexer for TantivySearchIndexer {
    async fn index(&self, package: &Package) -> Result<()> {
        let key = Self::document_key(package);
        debug!(%key, "indexing package in search");

        let mut writer = self.writer.lock().await;
        writer.delete_term(Term::from_field_text(self.key, &key));
        writer.add_document(doc!(
            self.key => key.as_str(),
            self.id => package.id.as_str(),
            self.description => package.description.as_deref().unwrap_or(""),
            self.summary => package.summary.as_deref().unwrap_or(""),
            self.tags => package.tags.join(" "),
            self.authors => package.authors.join(" "),
        ))?;
        writer.commit()?;

        Ok(())
    }
}
