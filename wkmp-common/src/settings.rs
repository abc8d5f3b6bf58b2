//! Durable key-value settings storage
//!
//! Settings are plain string values addressed by key. Components that need to
//! persist structured state (e.g. mirror reliability counters) serialize it
//! to JSON and store the blob under a single fixed key.

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;
#[cfg(feature = "sqlx")]
use std::path::Path;

/// Key-value persistence layer
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a value; `Ok(None)` if the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value (no-op if absent)
    async fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store, used in tests and when no database is configured
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

// ============================================================================
// SQLite store (shared `settings` table)
// ============================================================================

/// Initialize database connection pool and the `settings` table
#[cfg(feature = "sqlx")]
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_settings_table(&pool).await?;

    Ok(pool)
}

/// Create the `settings` table if it does not exist
#[cfg(feature = "sqlx")]
pub async fn init_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Settings backed by the shared SQLite `settings` table
#[cfg(feature = "sqlx")]
#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

#[cfg(feature = "sqlx")]
impl SqliteSettingsStore {
    /// Wrap an existing pool. The `settings` table must already exist
    /// (see [`init_settings_table`]).
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(feature = "sqlx")]
#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
