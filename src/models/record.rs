use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracking entry for one backup identity.
///
/// At most one record exists per `(source_database, backup_name)` pair;
/// re-creating a backup under the same identity overwrites the blob data in
/// place but leaves the record untouched.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BackupRecord {
    pub id: i64,
    #[serde(rename = "sourceDatabase")]
    pub source_database: String,
    #[serde(rename = "backupName")]
    pub backup_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
