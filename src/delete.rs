// src/delete.rs

//! Package deletion policies

use crate::config::DeletionBehavior;
use crate::db::PackageDatabase;
use crate::error::Result;
use crate::storage::PackageStorage;
use crate::version::PackageVersion;
use std::sync::Arc;
use tracing::{info, warn};

/// Applies the configured deletion policy consistently across the
/// metadata database and the content store.
pub struct PackageDeletionService {
    db: Arc<dyn PackageDatabase>,
    storage: Arc<PackageStorage>,
    behavior: DeletionBehavior,
}

impl PackageDeletionService {
    pub fn new(
        db: Arc<dyn PackageDatabase>,
        storage: Arc<PackageStorage>,
        behavior: DeletionBehavior,
    ) -> Self {
        Self {
            db,
            storage,
            behavior,
        }
    }

    /// Delete `(id, version)` under the configured policy. Returns
    /// whether a database row was found.
    pub async fn try_delete(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        match self.behavior {
            DeletionBehavior::Unlist => self.try_unlist(id, version).await,
            DeletionBehavior::HardDelete => self.try_hard_delete(id, version).await,
        }
    }

    /// Soft removal: the package stays stored but disappears from
    /// default listings. Never touches the content store.
    async fn try_unlist(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        info!(id, version = %version, "unlisting package");

        if !self.db.unlist(id, version).await? {
            warn!(id, version = %version, "cannot unlist, package not found");
            return Ok(false);
        }

        Ok(true)
    }

    /// Permanent removal from both stores. Storage content is deleted
    /// even when no database row was found: the stores may already be
    /// inconsistent after a partial failure, and this is the one path
    /// that reconverges them.
    async fn try_hard_delete(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        info!(id, version = %version, "hard deleting package");

        let found = self.db.hard_delete(id, version).await?;
        if !found {
            warn!(id, version = %version, "package not found in database, purging storage anyway");
        }

        self.storage
            .delete_content(id, &version.normalized())
            .await?;

        Ok(found)
    }
}
