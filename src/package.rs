// src/package.rs

//! The canonical package record and its dependency model

use crate::version::PackageVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single package version as known to the registry.
///
/// `(lowercase(id), normalized(version))` is the dedup key across the
/// metadata store. The metadata store is the source of truth: a package
/// absent from it does not exist, even if blob content happens to remain
/// in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Case-insensitive package identity, original casing preserved
    pub id: String,
    pub version: PackageVersion,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub license_url: Option<String>,
    pub project_url: Option<String>,
    pub repository_url: Option<String>,
    pub icon_url: Option<String>,
    /// Whether the archive carries an embedded readme
    pub has_readme: bool,
    /// Whether the archive carries an embedded icon
    pub has_icon: bool,
    pub is_prerelease: bool,
    /// Unlisted packages remain stored but are excluded from default
    /// listings and search
    pub listed: bool,
    /// Monotonically non-decreasing except on hard delete
    pub downloads: u64,
    pub published: DateTime<Utc>,
    pub dependencies: Vec<DependencyGroup>,
}

/// Dependencies of a package for one target, or target-agnostic when
/// `target` is `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGroup {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub packages: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    /// Version range expression, uninterpreted by this core
    #[serde(default)]
    pub range: Option<String>,
}

impl Package {
    /// Lowercase id used in storage paths and database keys
    pub fn id_lowercase(&self) -> String {
        self.id.to_lowercase()
    }

    /// Lowercase normalized version used in storage paths and database keys
    pub fn version_normalized(&self) -> String {
        self.version.normalized()
    }
}
