//! Materialization of a single table into the destination database.

use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;

use crate::error::{AppError, Result};
use crate::models::TableDescriptor;
use crate::rows::{bind_value, insert_sql};

/// Outcome of materializing one table
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub name: String,
    #[serde(rename = "indexCount")]
    pub index_count: usize,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
}

fn fail(table: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |source| AppError::MaterializationFailure {
        table: table.to_string(),
        source,
    }
}

/// Create one table's schema and insert its rows.
///
/// Runs the table DDL and all index DDL as one batch, then all row inserts
/// as a second batch, each in its own transaction. On failure the
/// destination is left as far as the failed batch reached; no compensating
/// rollback of earlier batches or tables is attempted.
pub async fn materialize_table(
    dest: &SqlitePool,
    descriptor: &TableDescriptor,
    rows: &[Vec<Value>],
) -> Result<TableReport> {
    let table = descriptor.name.as_str();

    // Schema batch: table first, then its indexes, before any data lands
    let mut tx = dest.begin().await.map_err(fail(table))?;
    sqlx::query(&descriptor.sql)
        .execute(&mut *tx)
        .await
        .map_err(fail(table))?;
    for index in &descriptor.indexes {
        sqlx::query(&index.sql)
            .execute(&mut *tx)
            .await
            .map_err(fail(table))?;
    }
    tx.commit().await.map_err(fail(table))?;

    // Data batch: one prepared statement, every row bound positionally
    if !rows.is_empty() {
        let insert = insert_sql(table, &descriptor.columns);
        let mut tx = dest.begin().await.map_err(fail(table))?;
        for row in rows {
            if row.len() != descriptor.columns.len() {
                return Err(AppError::InvalidInput(format!(
                    "Row for table {} has {} values, expected {}",
                    table,
                    row.len(),
                    descriptor.columns.len()
                )));
            }
            let mut query = sqlx::query(&insert);
            for value in row {
                query = bind_value(query, value)?;
            }
            query.execute(&mut *tx).await.map_err(fail(table))?;
        }
        tx.commit().await.map_err(fail(table))?;
    }

    Ok(TableReport {
        name: descriptor.name.clone(),
        index_count: descriptor.indexes.len(),
        row_count: rows.len(),
    })
}
