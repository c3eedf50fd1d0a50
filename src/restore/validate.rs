//! Destination-database safety check run before any restore mutation.

use std::collections::HashSet;

use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::error::Result;
use crate::models::BackupMetadata;

/// Return the subset of the backup's load order that already exists in the
/// destination database, in load order.
///
/// Matching is case-insensitive to follow SQLite identifier semantics. A
/// non-empty result means the restore must be refused; pre-existing tables
/// are never dropped or altered.
pub async fn find_conflicts(
    dest: &SqlitePool,
    metadata: &BackupMetadata,
) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
        .fetch_all(dest)
        .await?;

    let mut existing = HashSet::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name")?;
        existing.insert(name.to_lowercase());
    }

    Ok(metadata
        .load_order
        .iter()
        .filter(|table| existing.contains(&table.to_lowercase()))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{build_metadata, TableDescriptor};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::BTreeMap;

    fn metadata_for(names: &[&str]) -> BackupMetadata {
        let tables: BTreeMap<String, TableDescriptor> = names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    TableDescriptor {
                        name: name.to_string(),
                        sql: format!("CREATE TABLE {name} (id INTEGER PRIMARY KEY)"),
                        indexes: vec![],
                        columns: vec!["id".to_string()],
                        constraints: vec![],
                    },
                )
            })
            .collect();
        build_metadata(names.iter().map(|n| n.to_string()).collect(), tables)
    }

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_destination_has_no_conflicts() {
        let pool = memory_pool().await;
        let conflicts = find_conflicts(&pool, &metadata_for(&["Customers", "Orders"]))
            .await
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_reports_exact_colliding_names() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE Orders (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        let conflicts = find_conflicts(&pool, &metadata_for(&["Customers", "Orders"]))
            .await
            .unwrap();
        assert_eq!(conflicts, vec!["Orders"]);
    }

    #[tokio::test]
    async fn test_collision_detection_is_case_insensitive() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE orders (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        let conflicts = find_conflicts(&pool, &metadata_for(&["Orders"])).await.unwrap();
        assert_eq!(conflicts, vec!["Orders"]);
    }
}
