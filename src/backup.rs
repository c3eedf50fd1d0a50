//! Backup creation: introspect, resolve load order, and write the metadata
//! and per-table data objects to the blob store.

use serde_json::Value;
use sqlx::sqlite::SqlitePool;

use crate::blob::BlobStore;
use crate::constants::{CONTENT_TYPE_JSON, METADATA_OBJECT_NAME, TABLE_OBJECT_SUFFIX};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{build_metadata, BackupRecord};
use crate::rows::{encode_row, select_sql};
use crate::{depgraph, schema};

/// Key of the control document for a backup
pub fn metadata_key(source_database: &str, backup_name: &str) -> String {
    format!("{source_database}/{backup_name}/{METADATA_OBJECT_NAME}")
}

/// Object name of one table's data document
pub fn table_object_name(table: &str) -> String {
    format!("{table}{TABLE_OBJECT_SUFFIX}")
}

/// Key of one table's data object within a backup
pub fn table_key(source_database: &str, backup_name: &str, table: &str) -> String {
    format!(
        "{source_database}/{backup_name}/{}",
        table_object_name(table)
    )
}

/// Key of an archive-shaped backup: the backup name (which carries the
/// archive suffix) addresses a single object
pub fn archive_key(source_database: &str, backup_name: &str) -> String {
    format!("{source_database}/{backup_name}")
}

/// Create (or overwrite) the backup `(source_database, backup_name)`.
///
/// Writes one JSON object per table in load order, then the metadata object,
/// all under the `{sourceDatabase}/{backupName}/` prefix. Re-creating an
/// existing backup overwrites its objects in place; the tracking record for
/// the identity is created once and afterwards returned unchanged.
pub async fn create_backup(
    source: &SqlitePool,
    blob: &dyn BlobStore,
    tracking: &SqlitePool,
    source_database: &str,
    backup_name: &str,
) -> Result<BackupRecord> {
    let tables = schema::introspect(source).await?;

    // A table whose data object would be named like the control document
    // would be overwritten by it; refuse before writing anything
    if let Some(table) = tables
        .keys()
        .find(|t| table_object_name(t) == METADATA_OBJECT_NAME)
    {
        return Err(AppError::InvalidInput(format!(
            "Table {table:?} collides with the backup control document name"
        )));
    }

    let load_order = depgraph::resolve_load_order(&tables)?;
    let metadata = build_metadata(load_order, tables);

    for table in &metadata.load_order {
        let descriptor = &metadata.tables[table.as_str()];

        // Columns are requested in recorded order because restore re-binds
        // values positionally
        let rows = sqlx::query(&select_sql(&descriptor.name, &descriptor.columns))
            .fetch_all(source)
            .await?;
        let encoded: Vec<Vec<Value>> = rows.iter().map(encode_row).collect::<Result<_>>()?;

        blob.put(
            &table_key(source_database, backup_name, table),
            serde_json::to_vec(&encoded)?,
            CONTENT_TYPE_JSON,
        )
        .await?;

        tracing::debug!("Wrote {} rows for table {}", encoded.len(), table);
    }

    blob.put(
        &metadata_key(source_database, backup_name),
        serde_json::to_vec(&metadata)?,
        CONTENT_TYPE_JSON,
    )
    .await?;

    let record = db::upsert_record(tracking, source_database, backup_name).await?;

    tracing::info!(
        "Backup {} of database {} complete: {} tables",
        backup_name,
        source_database,
        metadata.load_order.len()
    );

    Ok(record)
}
