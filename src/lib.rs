// src/lib.rs

//! Keel Package Registry Core
//!
//! A package registry's ingestion and consistency engine: accepts
//! package archives, extracts their metadata, and commits them across
//! three independently-failing backends (content storage, metadata
//! database, search index) without a distributed transaction. Missing
//! packages can be filled transparently from an upstream feed at read
//! time.
//!
//! # Architecture
//!
//! - Result-first conflict signaling: store writes return tagged
//!   outcomes (`PutResult`, `PackageAddResult`) instead of throwing on
//!   duplicates; only genuine conflicts and infrastructure failures are
//!   errors
//! - Ingestion as an ordered step chain with short-circuit semantics;
//!   the mirror path and the push path share the same chain
//! - The metadata database is the source of truth; content storage and
//!   the search index are derived state
//!
//! HTTP routing, wire-format serialization, and authentication are the
//! host's concern; this crate exposes the service layer beneath them.

pub mod config;
pub mod db;
pub mod delete;
mod error;
pub mod extract;
pub mod ingest;
pub mod package;
pub mod registry;
pub mod search;
pub mod service;
pub mod storage;
pub mod upstream;
pub mod version;

pub use config::{DeletionBehavior, RegistryConfig};
pub use db::{PackageAddResult, PackageDatabase, SqliteDatabase};
pub use delete::PackageDeletionService;
pub use error::{Error, Result};
pub use extract::{extract_package, ExtractedPackage, Manifest};
pub use ingest::{
    IndexingContext, IndexingResult, IndexingStep, Next, PackageIngestor,
};
pub use package::{Dependency, DependencyGroup, Package};
pub use registry::Registry;
pub use search::{NullSearchIndexer, SearchIndexer, TantivySearchIndexer};
pub use service::PackageService;
pub use storage::{FileStorage, NullStorage, PackageStorage, PutResult, StorageService};
pub use upstream::{DisabledUpstreamClient, HttpUpstreamClient, UpstreamClient};
pub use version::PackageVersion;
