//! Schema introspection against the SQLite catalog.
//!
//! Produces one [`TableDescriptor`] per user table, with columns in declared
//! order, recreatable index DDL, and the foreign-key edges the dependency
//! resolver consumes.

use std::collections::BTreeMap;

use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::constants::RESERVED_TABLE_PREFIXES;
use crate::error::Result;
use crate::models::{ForeignKeyEdge, IndexDescriptor, TableDescriptor};
use crate::rows::quote_ident;

/// Introspect all user tables in the given database.
///
/// Engine catalog objects and platform-reserved tables are excluded by name
/// prefix. A database with no user tables is not an error.
pub async fn introspect(pool: &SqlitePool) -> Result<BTreeMap<String, TableDescriptor>> {
    let table_rows =
        sqlx::query("SELECT name, sql FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(pool)
            .await?;

    let mut tables = BTreeMap::new();

    for row in table_rows {
        let name: String = row.try_get("name")?;
        let sql: Option<String> = row.try_get("sql")?;

        if is_reserved(&name) {
            continue;
        }
        // Internal objects can have no recreatable DDL
        let Some(sql) = sql else {
            continue;
        };

        let columns = columns_for(pool, &name).await?;
        let indexes = indexes_for(pool, &name).await?;
        let constraints = foreign_keys_for(pool, &name).await?;

        tables.insert(
            name.clone(),
            TableDescriptor {
                name,
                sql,
                indexes,
                columns,
                constraints,
            },
        );
    }

    normalize_constraint_case(&mut tables);

    if tables.is_empty() {
        tracing::info!("Database contains no user tables");
    }

    Ok(tables)
}

fn is_reserved(name: &str) -> bool {
    RESERVED_TABLE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Column names in the order declared in the table DDL
async fn columns_for(pool: &SqlitePool, table: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
        .fetch_all(pool)
        .await?;

    let mut columns: Vec<(i64, String)> = Vec::with_capacity(rows.len());
    for row in rows {
        columns.push((row.try_get("cid")?, row.try_get("name")?));
    }
    columns.sort_by_key(|(cid, _)| *cid);

    Ok(columns.into_iter().map(|(_, name)| name).collect())
}

/// Explicitly created indexes for a table.
///
/// Auto-generated indexes (primary key, UNIQUE constraints) carry no DDL and
/// are recreated by the table DDL itself, so they are skipped.
async fn indexes_for(pool: &SqlitePool, table: &str) -> Result<Vec<IndexDescriptor>> {
    let rows = sqlx::query(
        "SELECT name, sql FROM sqlite_master
         WHERE type = 'index' AND tbl_name = ? AND sql IS NOT NULL
         ORDER BY name",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    let mut indexes = Vec::with_capacity(rows.len());
    for row in rows {
        indexes.push(IndexDescriptor {
            name: row.try_get("name")?,
            sql: row.try_get("sql")?,
        });
    }

    Ok(indexes)
}

async fn foreign_keys_for(pool: &SqlitePool, table: &str) -> Result<Vec<ForeignKeyEdge>> {
    let rows = sqlx::query(&format!("PRAGMA foreign_key_list({})", quote_ident(table)))
        .fetch_all(pool)
        .await?;

    let mut edges = Vec::with_capacity(rows.len());
    for row in rows {
        // "to" is NULL when the constraint references the target's primary key
        let referenced_column: Option<String> = row.try_get("to")?;
        edges.push(ForeignKeyEdge {
            referenced_table: row.try_get("table")?,
            local_column: row.try_get("from")?,
            referenced_column: referenced_column.unwrap_or_default(),
        });
    }

    Ok(edges)
}

/// Rewrite foreign-key target names to the case of the authoritative table
/// entry.
///
/// The engine reports referenced table names with the case used at
/// constraint-definition time, which can differ from the name in the
/// catalog. Mismatches are normalized with a diagnostic; edges pointing at
/// tables outside the introspected set (reserved or missing) are dropped.
fn normalize_constraint_case(tables: &mut BTreeMap<String, TableDescriptor>) {
    let canonical: BTreeMap<String, String> = tables
        .keys()
        .map(|name| (name.to_lowercase(), name.clone()))
        .collect();

    for descriptor in tables.values_mut() {
        let table = descriptor.name.clone();
        descriptor.constraints.retain_mut(|edge| {
            match canonical.get(&edge.referenced_table.to_lowercase()) {
                Some(authoritative) => {
                    if *authoritative != edge.referenced_table {
                        tracing::warn!(
                            "Foreign key on {} references {} with mismatched case; normalizing to {}",
                            table,
                            edge.referenced_table,
                            authoritative
                        );
                        edge.referenced_table = authoritative.clone();
                    }
                    true
                }
                None => {
                    tracing::warn!(
                        "Foreign key on {} references unknown table {}; ignoring edge",
                        table,
                        edge.referenced_table
                    );
                    false
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_introspect_columns_in_declared_order() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE Customers (id INTEGER PRIMARY KEY, name TEXT, email TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        let tables = introspect(&pool).await.unwrap();
        assert_eq!(tables["Customers"].columns, vec!["id", "name", "email"]);
        assert!(tables["Customers"].sql.contains("CREATE TABLE"));
    }

    #[tokio::test]
    async fn test_introspect_collects_indexes_and_foreign_keys() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE Customers (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE Orders (id INTEGER PRIMARY KEY,
             customerId INTEGER REFERENCES Customers(id))",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE INDEX idx_orders_customer ON Orders(customerId)")
            .execute(&pool)
            .await
            .unwrap();

        let tables = introspect(&pool).await.unwrap();

        let orders = &tables["Orders"];
        assert_eq!(orders.indexes.len(), 1);
        assert_eq!(orders.indexes[0].name, "idx_orders_customer");
        assert_eq!(orders.constraints.len(), 1);
        assert_eq!(orders.constraints[0].referenced_table, "Customers");
        assert_eq!(orders.constraints[0].local_column, "customerId");
    }

    #[tokio::test]
    async fn test_introspect_normalizes_referenced_table_case() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE Customers (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        // Constraint written with lowercased target name
        sqlx::query(
            "CREATE TABLE Orders (id INTEGER PRIMARY KEY,
             customerId INTEGER REFERENCES customers(id))",
        )
        .execute(&pool)
        .await
        .unwrap();

        let tables = introspect(&pool).await.unwrap();
        assert_eq!(tables["Orders"].constraints[0].referenced_table, "Customers");
    }

    #[tokio::test]
    async fn test_introspect_excludes_reserved_tables() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE _cf_KV (key TEXT PRIMARY KEY, value BLOB)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE Widgets (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        let tables = introspect(&pool).await.unwrap();
        assert_eq!(tables.len(), 1);
        assert!(tables.contains_key("Widgets"));
    }

    #[tokio::test]
    async fn test_introspect_empty_database() {
        let pool = memory_pool().await;
        let tables = introspect(&pool).await.unwrap();
        assert!(tables.is_empty());
    }
}
