use axum::{extract::State, Json};
use serde::Deserialize;

use crate::db;
use crate::error::Result;
use crate::models::BackupRecord;
use crate::routes::validation::{validate_backup_name, validate_database_id};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBackupRequest {
    #[serde(rename = "fromDatabase")]
    pub from_database: String,
    pub name: String,
}

/// Create (or overwrite) a backup of a bound database.
///
/// Writes all table data and the metadata document under the backup's key
/// prefix. Re-creating an existing `(fromDatabase, name)` identity
/// overwrites the stored objects and returns the original tracking record.
pub async fn create_backup(
    State(state): State<AppState>,
    Json(payload): Json<CreateBackupRequest>,
) -> Result<Json<BackupRecord>> {
    validate_database_id(&payload.from_database)?;
    validate_backup_name(&payload.name)?;

    let source = state.bindings.source_pool(&payload.from_database).await?;

    let record = crate::backup::create_backup(
        &source,
        state.blob.as_ref(),
        &state.tracking,
        &payload.from_database,
        &payload.name,
    )
    .await?;

    Ok(Json(record))
}

/// List all tracked backups
pub async fn list_backups(State(state): State<AppState>) -> Result<Json<Vec<BackupRecord>>> {
    let records = db::list_records(&state.tracking).await?;
    Ok(Json(records))
}
