// tests/common/mod.rs

//! Shared helpers for integration tests: fixture archives, an in-memory
//! fake upstream with call counting, and a fully wired registry harness.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use keel::{
    FileStorage, Package, PackageDatabase, PackageIngestor, PackageService, PackageStorage,
    PackageVersion, SearchIndexer, SqliteDatabase, UpstreamClient,
};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Honors `RUST_LOG` when set, so failing tests can be rerun with logs
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a zip archive from raw entries
pub fn archive_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A minimal valid package archive
pub fn test_archive(id: &str, version: &str) -> Vec<u8> {
    test_archive_described(id, version, "a test package")
}

/// A valid package archive with a chosen description, so two archives of
/// the same (id, version) can carry different content
pub fn test_archive_described(id: &str, version: &str, description: &str) -> Vec<u8> {
    let manifest = format!(
        "id = \"{id}\"\nversion = \"{version}\"\nauthors = [\"tester\"]\ndescription = \"{description}\"\ntags = [\"test\"]\n"
    );
    archive_with(&[
        ("manifest.toml", manifest.as_bytes()),
        ("payload.bin", description.as_bytes()),
    ])
}

/// A bare package record for seeding the database directly
pub fn package(id: &str, version: &str) -> Package {
    Package {
        id: id.to_string(),
        version: PackageVersion::parse(version).unwrap(),
        authors: vec!["tester".to_string()],
        description: Some("a test package".to_string()),
        summary: None,
        tags: vec!["test".to_string()],
        license_url: None,
        project_url: None,
        repository_url: None,
        icon_url: None,
        has_readme: false,
        has_icon: false,
        is_prerelease: false,
        listed: true,
        downloads: 0,
        published: Utc::now(),
        dependencies: Vec::new(),
    }
}

pub fn described_package(id: &str, version: &str, description: &str) -> Package {
    Package {
        description: Some(description.to_string()),
        ..package(id, version)
    }
}

/// Search indexer that records what it was asked to index
#[derive(Default)]
pub struct RecordingSearch {
    pub indexed: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SearchIndexer for RecordingSearch {
    async fn index(&self, package: &Package) -> keel::Result<()> {
        self.indexed
            .lock()
            .unwrap()
            .push((package.id.clone(), package.version_normalized()));
        Ok(())
    }
}

/// In-memory upstream feed with download call counting and a failure
/// switch
#[derive(Default)]
pub struct FakeUpstream {
    versions: Mutex<HashMap<String, Vec<PackageVersion>>>,
    packages: Mutex<HashMap<String, Vec<Package>>>,
    archives: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub download_calls: AtomicUsize,
    pub fail_downloads: AtomicBool,
    pub fail_listings: AtomicBool,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an archive (and its version) as available upstream
    pub fn add_archive(&self, id: &str, version: &str, archive: Vec<u8>) {
        let parsed = PackageVersion::parse(version).unwrap();
        self.versions
            .lock()
            .unwrap()
            .entry(id.to_lowercase())
            .or_default()
            .push(parsed.clone());
        self.archives
            .lock()
            .unwrap()
            .insert((id.to_lowercase(), parsed.normalized()), archive);
    }

    /// Register a package record as listed upstream
    pub fn add_package(&self, package: Package) {
        let id = package.id_lowercase();
        self.versions
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default()
            .push(package.version.clone());
        self.packages
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .push(package);
    }

    pub fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

fn listing_outage() -> keel::Error {
    keel::Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "simulated upstream outage",
    ))
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    async fn list_package_versions(&self, id: &str) -> keel::Result<Vec<PackageVersion>> {
        if self.fail_listings.load(Ordering::SeqCst) {
            return Err(listing_outage());
        }
        Ok(self
            .versions
            .lock()
            .unwrap()
            .get(&id.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn list_packages(&self, id: &str) -> keel::Result<Vec<Package>> {
        if self.fail_listings.load(Ordering::SeqCst) {
            return Err(listing_outage());
        }
        Ok(self
            .packages
            .lock()
            .unwrap()
            .get(&id.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn download_package_or_null(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> keel::Result<Option<Vec<u8>>> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(listing_outage());
        }

        Ok(self
            .archives
            .lock()
            .unwrap()
            .get(&(id.to_lowercase(), version.normalized()))
            .cloned())
    }
}

/// A registry wired from real components plus the fake upstream and the
/// recording search indexer
pub struct Harness {
    pub dir: TempDir,
    pub db: Arc<SqliteDatabase>,
    pub storage: Arc<PackageStorage>,
    pub backend: Arc<FileStorage>,
    pub search: Arc<RecordingSearch>,
    pub upstream: Arc<FakeUpstream>,
    pub ingestor: Arc<PackageIngestor>,
    pub service: PackageService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_overwrites(false)
    }

    pub fn with_overwrites(allow_overwrites: bool) -> Self {
        init_tracing();

        let dir = TempDir::new().unwrap();
        let backend = Arc::new(FileStorage::new(dir.path().join("packages")).unwrap());
        let storage = Arc::new(PackageStorage::new(backend.clone()));
        let db = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        let search = Arc::new(RecordingSearch::default());
        let upstream = Arc::new(FakeUpstream::new());

        let db_dyn: Arc<dyn PackageDatabase> = db.clone();
        let ingestor = Arc::new(PackageIngestor::with_default_steps(
            db_dyn.clone(),
            storage.clone(),
            search.clone(),
            allow_overwrites,
        ));

        let service = PackageService::new(db_dyn, upstream.clone(), ingestor.clone());

        Self {
            dir,
            db,
            storage,
            backend,
            search,
            upstream,
            ingestor,
            service,
        }
    }

    pub fn version(s: &str) -> PackageVersion {
        PackageVersion::parse(s).unwrap()
    }
}
