//! Integration tests for the on-disk settings store

use tempfile::TempDir;
use wkmp_common::settings::{init_database_pool, SettingsStore, SqliteSettingsStore};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("wkmp.db");

    let pool = init_database_pool(&db_path).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("wkmp.db");

    {
        let pool = init_database_pool(&db_path).await.unwrap();
        let store = SqliteSettingsStore::new(pool.clone());
        store.set("mirror_reliability", r#"{"version":1}"#).await.unwrap();
        pool.close().await;
    }

    // Second open must not wipe existing rows
    let pool = init_database_pool(&db_path).await.unwrap();
    let store = SqliteSettingsStore::new(pool);
    assert_eq!(
        store.get("mirror_reliability").await.unwrap(),
        Some(r#"{"version":1}"#.to_string())
    );
}
