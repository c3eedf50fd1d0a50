use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::restore::TableReport;
use crate::routes::validation::{validate_backup_name, validate_database_id};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RestoreBackupRequest {
    #[serde(rename = "fromDatabase")]
    pub from_database: String,
    #[serde(rename = "toDatabase")]
    pub to_database: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RestoreBackupResponse {
    /// One entry per materialized table, in materialization order
    pub tables: Vec<TableReport>,
}

/// Restore a backup into a bound destination database.
///
/// Refused outright if the destination already contains any table named in
/// the backup. Not transactional: a mid-restore failure leaves the tables
/// materialized so far in place.
pub async fn restore_backup(
    State(state): State<AppState>,
    Json(payload): Json<RestoreBackupRequest>,
) -> Result<Json<RestoreBackupResponse>> {
    validate_database_id(&payload.from_database)?;
    validate_database_id(&payload.to_database)?;
    validate_backup_name(&payload.name)?;

    let dest = state.bindings.dest_pool(&payload.to_database).await?;

    let tables = crate::restore::restore_backup(
        &dest,
        state.blob.clone(),
        &payload.from_database,
        &payload.name,
    )
    .await?;

    tracing::info!(
        "Restored backup {} of {} into {}: {} tables",
        payload.name,
        payload.from_database,
        payload.to_database,
        tables.len()
    );

    Ok(Json(RestoreBackupResponse { tables }))
}
