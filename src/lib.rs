//! dbvault: order-safe backup and restore for SQLite databases.
//!
//! Exports schema and data to a blob store under a deterministic key scheme
//! and restores into an empty destination, honoring foreign-key load order
//! for both discrete-object and archive-shaped backups.

pub mod backup;
pub mod blob;
pub mod config;
pub mod constants;
pub mod db;
pub mod depgraph;
pub mod error;
pub mod models;
pub mod restore;
pub mod routes;
pub mod rows;
pub mod schema;

pub use config::Config;
pub use error::{AppError, Result};

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use blob::BlobStore;
use db::DatabaseBindings;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub bindings: DatabaseBindings,
    pub blob: Arc<dyn BlobStore>,
    pub tracking: sqlx::SqlitePool,
    pub config: Config,
}

/// Build the application router over the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route(
            "/api/backups",
            post(routes::create_backup).get(routes::list_backups),
        )
        .route("/api/restores", post(routes::restore_backup))
        .with_state(state)
}
