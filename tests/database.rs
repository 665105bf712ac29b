// tests/database.rs

//! Metadata store consistency: dedup on (id, version), listing filters,
//! and the download counter

mod common;

use common::{described_package, package};
use keel::{PackageAddResult, PackageDatabase, PackageVersion, SqliteDatabase};

fn version(s: &str) -> PackageVersion {
    PackageVersion::parse(s).unwrap()
}

#[tokio::test]
async fn test_add_twice_keeps_first_row() {
    let db = SqliteDatabase::open_in_memory().unwrap();

    let first = described_package("foo", "1.0.0", "first push");
    let second = described_package("foo", "1.0.0", "second push");

    assert_eq!(db.add(&first).await.unwrap(), PackageAddResult::Success);
    assert_eq!(
        db.add(&second).await.unwrap(),
        PackageAddResult::PackageAlreadyExists
    );

    let stored = db
        .find_or_null("foo", &version("1.0.0"), true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.description.as_deref(), Some("first push"));
}

#[tokio::test]
async fn test_identity_is_case_insensitive() {
    let db = SqliteDatabase::open_in_memory().unwrap();
    db.add(&package("Foo.Bar", "1.0.0")).await.unwrap();

    assert!(db.exists("foo.bar").await.unwrap());
    assert!(db.exists("FOO.BAR").await.unwrap());
    assert!(db.version_exists("foo.BAR", &version("1.0.0")).await.unwrap());
    assert_eq!(
        db.add(&package("FOO.bar", "1.0.0")).await.unwrap(),
        PackageAddResult::PackageAlreadyExists
    );

    // The original casing is preserved in the record.
    let stored = db
        .find_or_null("foo.bar", &version("1.0.0"), true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, "Foo.Bar");
}

#[tokio::test]
async fn test_equivalent_version_forms_dedup() {
    let db = SqliteDatabase::open_in_memory().unwrap();
    db.add(&package("foo", "1.0")).await.unwrap();

    assert!(db.version_exists("foo", &version("1.0.0")).await.unwrap());
    assert_eq!(
        db.add(&package("foo", "1.0.0.0")).await.unwrap(),
        PackageAddResult::PackageAlreadyExists
    );
}

#[tokio::test]
async fn test_unlisted_rows_are_hidden_by_default() {
    let db = SqliteDatabase::open_in_memory().unwrap();
    db.add(&package("foo", "1.0.0")).await.unwrap();
    db.add(&package("foo", "2.0.0")).await.unwrap();

    assert!(db.unlist("foo", &version("1.0.0")).await.unwrap());

    let listed = db.find("foo", false).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].version_normalized(), "2.0.0");

    let all = db.find("foo", true).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(!all[0].listed);

    assert!(db
        .find_or_null("foo", &version("1.0.0"), false)
        .await
        .unwrap()
        .is_none());

    // Relist restores visibility.
    assert!(db.relist("foo", &version("1.0.0")).await.unwrap());
    assert_eq!(db.find("foo", false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unlist_nonexistent_returns_false() {
    let db = SqliteDatabase::open_in_memory().unwrap();

    assert!(db.find("baz", false).await.unwrap().is_empty());
    assert!(!db.unlist("baz", &version("1.0.0")).await.unwrap());
    assert!(db.find("baz", false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hard_delete_reports_row_presence() {
    let db = SqliteDatabase::open_in_memory().unwrap();
    db.add(&package("foo", "1.0.0")).await.unwrap();

    assert!(db.hard_delete("foo", &version("1.0.0")).await.unwrap());
    assert!(!db.hard_delete("foo", &version("1.0.0")).await.unwrap());
    assert!(!db.exists("foo").await.unwrap());
}

#[tokio::test]
async fn test_find_sorts_by_version() {
    let db = SqliteDatabase::open_in_memory().unwrap();
    for v in ["2.0.0", "1.0.0-beta", "10.0.0", "1.0.0"] {
        db.add(&package("foo", v)).await.unwrap();
    }

    let found = db.find("foo", true).await.unwrap();
    let versions: Vec<String> = found.iter().map(|p| p.version_normalized()).collect();
    assert_eq!(versions, ["1.0.0-beta", "1.0.0", "2.0.0", "10.0.0"]);
}

#[tokio::test]
async fn test_download_counter_increments() {
    let db = SqliteDatabase::open_in_memory().unwrap();
    db.add(&package("foo", "1.0.0")).await.unwrap();

    for _ in 0..3 {
        db.add_download("foo", &version("1.0.0")).await.unwrap();
    }

    let stored = db
        .find_or_null("foo", &version("1.0.0"), true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.downloads, 3);
}
