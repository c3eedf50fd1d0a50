use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unknown database binding: {0}")]
    UnknownDatabaseBinding(String),

    #[error("Backup metadata not found")]
    MetadataNotFound,

    #[error("Backup not found")]
    BackupNotFound,

    #[error("Destination already contains tables: {}", .0.join(", "))]
    TableConflict(Vec<String>),

    #[error("Backup is missing table objects: {}", .0.join(", "))]
    MissingAssets(Vec<String>),

    #[error("Unexpected archive member {found:?}, expected {expected:?}")]
    UnexpectedMember { found: String, expected: String },

    #[error("Archive member {0:?} does not match any table in the backup metadata")]
    UnknownTableMember(String),

    #[error("Cyclic foreign-key dependency involving table {0:?}")]
    CyclicDependency(String),

    #[error("Failed to materialize table {table:?}: {source}")]
    MaterializationFailure {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::UnknownDatabaseBinding(ref name) => {
                tracing::warn!("Request for unbound database: {}", name);
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::MetadataNotFound | AppError::BackupNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::TableConflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::MissingAssets(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::UnexpectedMember { .. }
            | AppError::UnknownTableMember(_)
            | AppError::CyclicDependency(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::MaterializationFailure {
                ref table,
                ref source,
            } => {
                tracing::error!("Materialization failed for table {}: {:?}", table, source);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Io(ref e) => {
                tracing::error!("I/O error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::TaskJoin(ref e) => {
                tracing::error!("Task join error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::InvalidInput(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
