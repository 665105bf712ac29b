// src/db/sqlite.rs

//! SQLite-backed metadata store
//!
//! One connection guarded by an async mutex; every call is a short,
//! non-blocking-in-practice statement. Structured fields (authors, tags,
//! dependency groups) are stored as JSON columns. The download counter
//! carries a `row_version` column so increments are optimistic
//! read-modify-write cycles with a visible, bounded retry loop.

use crate::db::{PackageAddResult, PackageDatabase};
use crate::error::{Error, Result};
use crate::package::Package;
use crate::version::PackageVersion;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Attempts for one download-counter increment before giving up. The
/// counter is high-contention and low-value-per-write: unbounded retry
/// risks livelock, zero retry systematically undercounts.
pub const MAX_DOWNLOAD_ATTEMPTS: u32 = 5;

const PACKAGE_COLUMNS: &str = "package_id, version, authors, description, summary, tags, \
     license_url, project_url, repository_url, icon_url, \
     has_readme, has_icon, is_prerelease, listed, downloads, published, dependencies";

/// SQLite implementation of [`PackageDatabase`]
pub struct SqliteDatabase {
    conn: tokio::sync::Mutex<Connection>,
}

impl SqliteDatabase {
    /// Open (or create) the database at `path` and apply migrations
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        migrate(&conn)?;
        Ok(Self {
            conn: tokio::sync::Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests and ephemeral registries
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: tokio::sync::Mutex::new(conn),
        })
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current: i32 = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);

    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=SCHEMA_VERSION {
        debug!(version, "applying schema migration");
        apply_migration(conn, version)?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    }

    info!(version = SCHEMA_VERSION, "database schema up to date");
    Ok(())
}

fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => {
            conn.execute(
                "CREATE TABLE packages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    package_id TEXT NOT NULL,
                    package_id_lower TEXT NOT NULL,
                    version TEXT NOT NULL,
                    authors TEXT NOT NULL,
                    description TEXT,
                    summary TEXT,
                    tags TEXT NOT NULL,
                    license_url TEXT,
                    project_url TEXT,
                    repository_url TEXT,
                    icon_url TEXT,
                    has_readme INTEGER NOT NULL,
                    has_icon INTEGER NOT NULL,
                    is_prerelease INTEGER NOT NULL,
                    listed INTEGER NOT NULL,
                    downloads INTEGER NOT NULL DEFAULT 0,
                    row_version INTEGER NOT NULL DEFAULT 0,
                    published TEXT NOT NULL,
                    dependencies TEXT NOT NULL,
                    UNIQUE (package_id_lower, version)
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX idx_packages_id_lower ON packages (package_id_lower)",
                [],
            )?;
        }
        other => {
            return Err(Error::InvalidRecord(format!(
                "unknown schema migration {other}"
            )))
        }
    }
    Ok(())
}

fn package_from_row(row: &Row<'_>) -> rusqlite::Result<RawPackageRow> {
    Ok(RawPackageRow {
        package_id: row.get(0)?,
        version: row.get(1)?,
        authors: row.get(2)?,
        description: row.get(3)?,
        summary: row.get(4)?,
        tags: row.get(5)?,
        license_url: row.get(6)?,
        project_url: row.get(7)?,
        repository_url: row.get(8)?,
        icon_url: row.get(9)?,
        has_readme: row.get(10)?,
        has_icon: row.get(11)?,
        is_prerelease: row.get(12)?,
        listed: row.get(13)?,
        downloads: row.get(14)?,
        published: row.get(15)?,
        dependencies: row.get(16)?,
    })
}

/// Column values as stored, before JSON/version/timestamp decoding
struct RawPackageRow {
    package_id: String,
    version: String,
    authors: String,
    description: Option<String>,
    summary: Option<String>,
    tags: String,
    license_url: Option<String>,
    project_url: Option<String>,
    repository_url: Option<String>,
    icon_url: Option<String>,
    has_readme: bool,
    has_icon: bool,
    is_prerelease: bool,
    listed: bool,
    downloads: u64,
    published: String,
    dependencies: String,
}

impl RawPackageRow {
    fn decode(self) -> Result<Package> {
        let version = PackageVersion::parse(&self.version)
            .map_err(|_| Error::InvalidRecord(format!("stored version '{}'", self.version)))?;
        let published: DateTime<Utc> = self
            .published
            .parse()
            .map_err(|_| Error::InvalidRecord(format!("stored timestamp '{}'", self.published)))?;

        Ok(Package {
            id: self.package_id,
            version,
            authors: serde_json::from_str(&self.authors)?,
            description: self.description,
            summary: self.summary,
            tags: serde_json::from_str(&self.tags)?,
            license_url: self.license_url,
            project_url: self.project_url,
            repository_url: self.repository_url,
            icon_url: self.icon_url,
            has_readme: self.has_readme,
            has_icon: self.has_icon,
            is_prerelease: self.is_prerelease,
            listed: self.listed,
            downloads: self.downloads,
            published,
            dependencies: serde_json::from_str(&self.dependencies)?,
        })
    }
}

/// Flip the `listed` flag; shared by unlist and relist
fn set_listed(conn: &Connection, id: &str, version: &PackageVersion, listed: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE packages SET listed = ?1, row_version = row_version + 1
         WHERE package_id_lower = ?2 AND version = ?3",
        params![listed, id.to_lowercase(), version.normalized()],
    )?;
    Ok(changed > 0)
}

/// One optimistic snapshot of the download counter
struct CounterSnapshot {
    downloads: u64,
    row_version: i64,
}

fn counter_snapshot(
    conn: &Connection,
    id: &str,
    version: &PackageVersion,
) -> Result<Option<CounterSnapshot>> {
    let snapshot = conn
        .query_row(
            "SELECT downloads, row_version FROM packages
             WHERE package_id_lower = ?1 AND version = ?2",
            params![id.to_lowercase(), version.normalized()],
            |row| {
                Ok(CounterSnapshot {
                    downloads: row.get(0)?,
                    row_version: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(snapshot)
}

/// Write back an incremented counter, guarded by the snapshot's
/// `row_version`. Returns false when the precondition failed.
fn try_write_download(
    conn: &Connection,
    id: &str,
    version: &PackageVersion,
    snapshot: &CounterSnapshot,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE packages SET downloads = ?1, row_version = row_version + 1
         WHERE package_id_lower = ?2 AND version = ?3 AND row_version = ?4",
        params![
            snapshot.downloads + 1,
            id.to_lowercase(),
            version.normalized(),
            snapshot.row_version
        ],
    )?;
    Ok(changed > 0)
}

#[async_trait]
impl PackageDatabase for SqliteDatabase {
    async fn add(&self, package: &Package) -> Result<PackageAddResult> {
        let conn = self.conn.lock().await;

        let result = conn.execute(
            &format!(
                "INSERT INTO packages (package_id_lower, {PACKAGE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
            ),
            params![
                package.id_lowercase(),
                package.id,
                package.version_normalized(),
                serde_json::to_string(&package.authors)?,
                package.description,
                package.summary,
                serde_json::to_string(&package.tags)?,
                package.license_url,
                package.project_url,
                package.repository_url,
                package.icon_url,
                package.has_readme,
                package.has_icon,
                package.is_prerelease,
                package.listed,
                package.downloads,
                package.published.to_rfc3339(),
                serde_json::to_string(&package.dependencies)?,
            ],
        );

        match result {
            Ok(_) => Ok(PackageAddResult::Success),
            Err(e) if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) => {
                Ok(PackageAddResult::PackageAlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM packages WHERE package_id_lower = ?1 LIMIT 1",
                params![id.to_lowercase()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn version_exists(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        let conn = self.conn.lock().await;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM packages WHERE package_id_lower = ?1 AND version = ?2 LIMIT 1",
                params![id.to_lowercase(), version.normalized()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn find(&self, id: &str, include_unlisted: bool) -> Result<Vec<Package>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages
             WHERE package_id_lower = ?1{}",
            if include_unlisted { "" } else { " AND listed = 1" }
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![id.to_lowercase()], package_from_row)?;

        let mut packages = Vec::new();
        for row in rows {
            packages.push(row?.decode()?);
        }
        packages.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(packages)
    }

    async fn find_or_null(
        &self,
        id: &str,
        version: &PackageVersion,
        include_unlisted: bool,
    ) -> Result<Option<Package>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages
             WHERE package_id_lower = ?1 AND version = ?2{}",
            if include_unlisted { "" } else { " AND listed = 1" }
        );
        let raw = conn
            .query_row(
                &sql,
                params![id.to_lowercase(), version.normalized()],
                package_from_row,
            )
            .optional()?;

        raw.map(RawPackageRow::decode).transpose()
    }

    async fn unlist(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        let conn = self.conn.lock().await;
        set_listed(&conn, id, version, false)
    }

    async fn relist(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        let conn = self.conn.lock().await;
        set_listed(&conn, id, version, true)
    }

    async fn add_download(&self, id: &str, version: &PackageVersion) -> Result<()> {
        for attempt in 1..=MAX_DOWNLOAD_ATTEMPTS {
            let conn = self.conn.lock().await;

            let snapshot = match counter_snapshot(&conn, id, version)? {
                Some(snapshot) => snapshot,
                // Counting a download of a package that no longer has a
                // row is a no-op, not an error.
                None => return Ok(()),
            };

            if try_write_download(&conn, id, version, &snapshot)? {
                return Ok(());
            }

            warn!(
                id,
                version = %version,
                attempt,
                max = MAX_DOWNLOAD_ATTEMPTS,
                "download counter write lost an optimistic race, retrying"
            );
        }

        Err(Error::DownloadCounterContention {
            id: id.to_string(),
            version: version.normalized(),
            attempts: MAX_DOWNLOAD_ATTEMPTS,
        })
    }

    async fn hard_delete(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "DELETE FROM packages WHERE package_id_lower = ?1 AND version = ?2",
            params![id.to_lowercase(), version.normalized()],
        )?;
        Ok(changed > 0)
    }
}
