//! Restore orchestration.
//!
//! Two transport variants (random-access keyed objects, sequential archive)
//! feed one shared pipeline: validate the destination, then materialize each
//! table in load order. The variant is selected by the backup name's suffix,
//! a property of the backup identity rather than a caller-chosen mode.

pub mod materialize;
pub mod source;
pub mod validate;

use std::sync::Arc;

use sqlx::sqlite::SqlitePool;

use crate::backup::table_object_name;
use crate::blob::BlobStore;
use crate::constants::{METADATA_OBJECT_NAME, TAR_SUFFIX, TGZ_SUFFIX};
use crate::error::{AppError, Result};
use crate::models::BackupMetadata;

pub use materialize::{materialize_table, TableReport};
pub use source::RestoreSource;
pub use validate::find_conflicts;

/// Restore the named backup into the destination database.
///
/// The destination must contain none of the backup's tables; on any failure
/// the restore stops immediately and already-materialized tables are left in
/// place for manual inspection. No rollback is performed.
pub async fn restore_backup(
    dest: &SqlitePool,
    blob: Arc<dyn BlobStore>,
    source_database: &str,
    backup_name: &str,
) -> Result<Vec<TableReport>> {
    let (metadata, source) = if is_archive_backup(backup_name) {
        RestoreSource::open_archive(blob, source_database, backup_name).await?
    } else {
        RestoreSource::open_keyed(blob, source_database, backup_name).await?
    };

    run_restore(dest, &metadata, source).await
}

/// Archive-shaped backups are addressed as a single sequentially-read object
fn is_archive_backup(backup_name: &str) -> bool {
    backup_name.ends_with(TAR_SUFFIX) || backup_name.ends_with(TGZ_SUFFIX)
}

/// Shared pipeline for both transport variants.
///
/// Validation runs before any DDL; materialization is strictly sequential in
/// load order so foreign-key targets exist before their dependents.
pub async fn run_restore(
    dest: &SqlitePool,
    metadata: &BackupMetadata,
    mut source: RestoreSource,
) -> Result<Vec<TableReport>> {
    // A table named like the control document makes the payload sequence
    // ambiguous in both transports; such metadata is never written by the
    // backup path and is refused here
    if let Some(table) = metadata
        .load_order
        .iter()
        .find(|t| table_object_name(t) == METADATA_OBJECT_NAME)
    {
        return Err(AppError::InvalidInput(format!(
            "Backup metadata names table {table:?}, which collides with the control document"
        )));
    }

    let conflicts = find_conflicts(dest, metadata).await?;
    if !conflicts.is_empty() {
        tracing::warn!(
            "Refusing restore, destination already has tables: {}",
            conflicts.join(", ")
        );
        return Err(AppError::TableConflict(conflicts));
    }

    let mut reports = Vec::with_capacity(metadata.load_order.len());
    for table in &metadata.load_order {
        let descriptor = metadata
            .tables
            .get(table)
            .ok_or_else(|| AppError::UnknownTableMember(table.clone()))?;

        let rows = source.next_payload(table, metadata).await?;
        let report = materialize_table(dest, descriptor, &rows).await?;
        tracing::info!(
            "Materialized table {} ({} rows, {} indexes)",
            report.name,
            report.row_count,
            report.index_count
        );
        reports.push(report);
    }

    source.finish(metadata)?;

    Ok(reports)
}
