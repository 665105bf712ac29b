// tests/deletion.rs

//! Deletion policies: unlisting hides a package without touching its
//! content, while a hard delete purges both stores.

mod common;

use common::{test_archive, Harness};
use keel::{DeletionBehavior, Error, PackageDatabase, PackageDeletionService};

fn deleter(h: &Harness, behavior: DeletionBehavior) -> PackageDeletionService {
    PackageDeletionService::new(h.db.clone(), h.storage.clone(), behavior)
}

#[tokio::test]
async fn test_unlist_hides_but_keeps_content() {
    let h = Harness::new();
    h.ingestor
        .index(test_archive("foo", "1.0.0"))
        .await
        .unwrap();

    let deleted = deleter(&h, DeletionBehavior::Unlist)
        .try_delete("foo", &Harness::version("1.0.0"))
        .await
        .unwrap();
    assert!(deleted);

    // Gone from default listings, still reachable when asked for.
    assert!(h.db.find("foo", false).await.unwrap().is_empty());
    let hidden = h
        .db
        .find_or_null("foo", &Harness::version("1.0.0"), true)
        .await
        .unwrap()
        .unwrap();
    assert!(!hidden.listed);

    // Content untouched.
    assert!(h.storage.get_archive("foo", "1.0.0").await.is_ok());
}

#[tokio::test]
async fn test_unlist_missing_package_returns_false() {
    let h = Harness::new();

    let deleted = deleter(&h, DeletionBehavior::Unlist)
        .try_delete("foo", &Harness::version("1.0.0"))
        .await
        .unwrap();
    assert!(!deleted);
}

#[tokio::test]
async fn test_hard_delete_purges_both_stores() {
    let h = Harness::new();
    h.ingestor
        .index(test_archive("foo", "1.0.0"))
        .await
        .unwrap();

    let deleted = deleter(&h, DeletionBehavior::HardDelete)
        .try_delete("foo", &Harness::version("1.0.0"))
        .await
        .unwrap();
    assert!(deleted);

    assert!(!h.db.exists("foo").await.unwrap());
    assert!(matches!(
        h.storage.get_archive("foo", "1.0.0").await,
        Err(Error::BlobNotFound { .. })
    ));
}

#[tokio::test]
async fn test_hard_delete_purges_orphaned_content() {
    let h = Harness::new();

    // Content without a database row, as after a partial failure.
    let orphan = common::package("foo", "1.0.0");
    h.storage
        .save_content(&orphan, b"archive", b"manifest", None, None)
        .await
        .unwrap();

    let deleted = deleter(&h, DeletionBehavior::HardDelete)
        .try_delete("foo", &Harness::version("1.0.0"))
        .await
        .unwrap();
    assert!(!deleted);

    // No row was found, but the orphaned blobs are gone.
    assert!(matches!(
        h.storage.get_archive("foo", "1.0.0").await,
        Err(Error::BlobNotFound { .. })
    ));
}

#[tokio::test]
async fn test_deleted_version_can_be_pushed_again() {
    let h = Harness::new();
    let archive = test_archive("foo", "1.0.0");
    h.ingestor.index(archive.clone()).await.unwrap();

    deleter(&h, DeletionBehavior::HardDelete)
        .try_delete("foo", &Harness::version("1.0.0"))
        .await
        .unwrap();

    assert_eq!(
        h.ingestor.index(archive).await.unwrap(),
        keel::IndexingResult::Success
    );
    assert!(h.db.exists("foo").await.unwrap());
}
