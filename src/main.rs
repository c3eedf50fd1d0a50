use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbvault::blob::{BlobStore, FsBlobStore, MemoryBlobStore};
use dbvault::db::{open_tracking, DatabaseBindings};
use dbvault::{router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dbvault=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting dbvault...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}, {} database binding(s)",
        config.environment,
        config.server_address(),
        config.database_bindings.len()
    );

    // Open the tracking database (creates its schema on first run)
    let tracking = open_tracking(&config.tracking_database_path).await?;

    // Select the blob store
    let blob: Arc<dyn BlobStore> = match &config.blob_store_root {
        Some(root) => {
            tracing::info!("Using filesystem blob store at {}", root);
            Arc::new(FsBlobStore::new(root))
        }
        None => {
            tracing::warn!("BLOB_STORE_ROOT not set; using in-memory blob store (backups are lost on restart)");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let bindings = DatabaseBindings::new(config.database_bindings.clone());

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origins
                .iter()
                .filter_map(|s| s.parse::<axum::http::HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    // Create app state
    let state = AppState {
        bindings,
        blob,
        tracking,
        config: config.clone(),
    };

    // Build router
    let app = router(state).layer(cors);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
