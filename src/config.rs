// src/config.rs

//! Registry configuration

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// What a delete request does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletionBehavior {
    /// Soft removal: keep content and metadata, hide from listings
    Unlist,
    /// Permanent removal from both metadata and content stores
    HardDelete,
}

/// Configuration consumed by the registry core. Loaded from TOML by the
/// host; every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RegistryConfig {
    /// Path of the metadata database file
    pub database_path: PathBuf,
    /// Root directory of the content store; `None` disables content
    /// storage (null backend)
    pub storage_path: Option<PathBuf>,
    /// Directory of the search index; `None` disables search indexing
    pub search_path: Option<PathBuf>,
    /// Base URL of the upstream feed; `None` disables mirroring
    pub upstream_url: Option<String>,
    /// Whether pushing an existing (id, version) replaces it instead of
    /// being rejected
    pub allow_package_overwrites: bool,
    pub deletion_behavior: DeletionBehavior,
    /// Timeout for upstream requests, in seconds
    pub upstream_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("keel.db"),
            storage_path: Some(PathBuf::from("packages")),
            search_path: None,
            upstream_url: None,
            allow_package_overwrites: false,
            deletion_behavior: DeletionBehavior::Unlist,
            upstream_timeout_secs: 30,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.deletion_behavior, DeletionBehavior::Unlist);
        assert!(!config.allow_package_overwrites);
        assert!(config.upstream_url.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let config: RegistryConfig = toml::from_str(
            r#"
database-path = "/var/lib/keel/keel.db"
storage-path = "/var/lib/keel/packages"
upstream-url = "https://feed.example.org/v3"
deletion-behavior = "hard-delete"
allow-package-overwrites = true
"#,
        )
        .unwrap();

        assert_eq!(config.deletion_behavior, DeletionBehavior::HardDelete);
        assert!(config.allow_package_overwrites);
        assert_eq!(
            config.upstream_url.as_deref(),
            Some("https://feed.example.org/v3")
        );
        assert!(config.search_path.is_none());
    }
}
