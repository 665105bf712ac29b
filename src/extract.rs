// src/extract.rs

//! Package archive reading and metadata extraction
//!
//! Archives are zip files carrying a `manifest.toml` at the archive root
//! plus arbitrary payload entries. The manifest may name a readme and an
//! icon entry. Extraction materializes every sub-stream into its own
//! buffer so later pipeline steps can consume them independently of the
//! original archive.
//!
//! Any structural problem (not a zip, missing manifest, bad TOML, missing
//! mandatory fields, dangling readme/icon reference) surfaces as
//! `Error::InvalidPackage` and has no side effects.

use crate::error::{Error, Result};
use crate::package::{DependencyGroup, Package};
use crate::version::PackageVersion;
use chrono::Utc;
use serde::Deserialize;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Name of the manifest entry at the archive root
pub const MANIFEST_FILE_NAME: &str = "manifest.toml";

/// A package archive decomposed into its independently-buffered artifacts
#[derive(Debug)]
pub struct ExtractedPackage {
    pub package: Package,
    /// The raw manifest bytes, stored as a sibling artifact
    pub manifest: Vec<u8>,
    pub readme: Option<Vec<u8>>,
    pub icon: Option<Vec<u8>>,
}

/// The manifest embedded in a package archive
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Manifest {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub license_url: Option<String>,
    #[serde(default)]
    pub project_url: Option<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    /// Archive entry path of the readme, if the package embeds one
    #[serde(default)]
    pub readme: Option<String>,
    /// Archive entry path of the icon, if the package embeds one
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyGroup>,
}

impl Manifest {
    /// Parse a manifest from its raw bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::invalid_package("manifest is not valid UTF-8"))?;
        let manifest: Manifest = toml::from_str(text)
            .map_err(|e| Error::invalid_package(format!("manifest parse error: {e}")))?;

        if manifest.id.trim().is_empty() {
            return Err(Error::invalid_package("manifest is missing a package id"));
        }
        if manifest.version.trim().is_empty() {
            return Err(Error::invalid_package("manifest is missing a version"));
        }

        Ok(manifest)
    }

    /// Convert into a freshly-published package record
    pub fn into_package(self) -> Result<Package> {
        let version = PackageVersion::parse(&self.version)
            .map_err(|_| Error::invalid_package(format!("invalid version '{}'", self.version)))?;

        let has_readme = self.readme.is_some();
        let has_icon = self.icon.is_some();
        let is_prerelease = version.is_prerelease();

        Ok(Package {
            id: self.id,
            version,
            authors: self.authors,
            description: self.description,
            summary: self.summary,
            tags: self.tags,
            license_url: self.license_url,
            project_url: self.project_url,
            repository_url: self.repository_url,
            icon_url: self.icon_url,
            has_readme,
            has_icon,
            is_prerelease,
            listed: true,
            downloads: 0,
            published: Utc::now(),
            dependencies: self.dependencies,
        })
    }
}

/// Extract a package record and its detached artifact buffers from a raw
/// archive. The archive bytes themselves are not modified.
pub fn extract_package(bytes: &[u8]) -> Result<ExtractedPackage> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::invalid_package(format!("not a valid archive: {e}")))?;

    let manifest_bytes = read_entry(&mut archive, MANIFEST_FILE_NAME)?
        .ok_or_else(|| Error::invalid_package("archive has no manifest.toml"))?;

    let manifest = Manifest::parse(&manifest_bytes)?;

    let readme = match &manifest.readme {
        Some(path) => Some(read_entry(&mut archive, path)?.ok_or_else(|| {
            Error::invalid_package(format!("manifest names missing readme entry '{path}'"))
        })?),
        None => None,
    };

    let icon = match &manifest.icon {
        Some(path) => Some(read_entry(&mut archive, path)?.ok_or_else(|| {
            Error::invalid_package(format!("manifest names missing icon entry '{path}'"))
        })?),
        None => None,
    };

    let package = manifest.into_package()?;

    Ok(ExtractedPackage {
        package,
        manifest: manifest_bytes,
        readme,
        icon,
    })
}

/// Read one archive entry into its own buffer, or `None` if absent
fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(Error::invalid_package(format!(
                "unreadable archive entry '{name}': {e}"
            )))
        }
    };

    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut buf)
        .map_err(|e| Error::invalid_package(format!("truncated archive entry '{name}': {e}")))?;

    Ok(Some(buf))
}
