use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::{AppError, Result};
use crate::models::BackupRecord;

/// Logical database name -> SQLite file path, from configuration.
///
/// Every request names its databases by binding name; unbound names are
/// refused before any I/O happens.
#[derive(Debug, Clone)]
pub struct DatabaseBindings {
    bindings: HashMap<String, String>,
}

impl DatabaseBindings {
    pub fn new(bindings: HashMap<String, String>) -> Self {
        Self { bindings }
    }

    fn path_for(&self, name: &str) -> Result<&str> {
        self.bindings
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::UnknownDatabaseBinding(name.to_string()))
    }

    /// Connect to a backup source database; the file must already exist
    pub async fn source_pool(&self, name: &str) -> Result<SqlitePool> {
        connect(self.path_for(name)?, false).await
    }

    /// Connect to a restore destination; an absent file becomes a fresh
    /// empty database
    pub async fn dest_pool(&self, name: &str) -> Result<SqlitePool> {
        connect(self.path_for(name)?, true).await
    }
}

/// Open a single-connection pool for the given SQLite file.
///
/// SQLite permits limited write concurrency; a single connection keeps
/// statement order deterministic within one operation.
async fn connect(path: &str, create_if_missing: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create_if_missing);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Open the service's own tracking database and create its schema on first run
pub async fn open_tracking(path: &str) -> Result<SqlitePool> {
    tracing::info!("Opening tracking database at: {}", path);

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = connect(path, true).await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS backup_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_database TEXT NOT NULL,
            backup_name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (source_database, backup_name)
        )",
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

/// Insert a tracking record for `(source_database, backup_name)` if none
/// exists, and return the record for that identity.
///
/// Repeat creates under the same identity are a no-op here: the existing
/// record is returned unchanged, even though the blob data was overwritten.
pub async fn upsert_record(
    pool: &SqlitePool,
    source_database: &str,
    backup_name: &str,
) -> Result<BackupRecord> {
    sqlx::query(
        "INSERT INTO backup_records (source_database, backup_name, created_at)
         VALUES (?, ?, ?)
         ON CONFLICT (source_database, backup_name) DO NOTHING",
    )
    .bind(source_database)
    .bind(backup_name)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let record = sqlx::query_as::<_, BackupRecord>(
        "SELECT id, source_database, backup_name, created_at
         FROM backup_records
         WHERE source_database = ? AND backup_name = ?",
    )
    .bind(source_database)
    .bind(backup_name)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// List all tracked backups, newest first
pub async fn list_records(pool: &SqlitePool) -> Result<Vec<BackupRecord>> {
    let records = sqlx::query_as::<_, BackupRecord>(
        "SELECT id, source_database, backup_name, created_at
         FROM backup_records
         ORDER BY id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_tracking() -> SqlitePool {
        let pool = connect(":memory:", true).await.unwrap();
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS backup_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_database TEXT NOT NULL,
                backup_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (source_database, backup_name)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_upsert_record_is_idempotent() {
        let pool = memory_tracking().await;

        let first = upsert_record(&pool, "main", "nightly").await.unwrap();
        let second = upsert_record(&pool, "main", "nightly").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(list_records(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_identities_get_distinct_records() {
        let pool = memory_tracking().await;

        upsert_record(&pool, "main", "nightly").await.unwrap();
        upsert_record(&pool, "main", "weekly").await.unwrap();
        upsert_record(&pool, "stats", "nightly").await.unwrap();

        assert_eq!(list_records(&pool).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unbound_database_is_refused() {
        let bindings = DatabaseBindings::new(HashMap::new());
        let err = bindings.source_pool("nope").await.unwrap_err();
        assert!(matches!(err, AppError::UnknownDatabaseBinding(name) if name == "nope"));
    }
}
