use std::collections::HashMap;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Logical database name -> SQLite file path
    pub database_bindings: HashMap<String, String>,
    /// Path of the service's own tracking database
    pub tracking_database_path: String,
    /// Root directory for the filesystem blob store; None selects the
    /// in-memory store (development only, contents are lost on restart)
    pub blob_store_root: Option<String>,
    pub allowed_origins: Vec<String>,
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_bindings = parse_bindings(
            &env::var("DATABASE_BINDINGS")
                .map_err(|_| "DATABASE_BINDINGS must be set (name=path,name=path,...)")?,
        )?;

        let tracking_database_path =
            env::var("TRACKING_DATABASE_PATH").unwrap_or_else(|_| "./data/dbvault.db".to_string());

        let blob_store_root = env::var("BLOB_STORE_ROOT").ok();

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            server_host,
            server_port,
            database_bindings,
            tracking_database_path,
            blob_store_root,
            allowed_origins,
            environment,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Parse a `name=path,name=path` binding list
fn parse_bindings(raw: &str) -> Result<HashMap<String, String>, String> {
    let mut bindings = HashMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, path) = entry
            .split_once('=')
            .ok_or_else(|| format!("Invalid DATABASE_BINDINGS entry: {entry:?}"))?;
        let name = name.trim();
        let path = path.trim();
        if name.is_empty() || path.is_empty() {
            return Err(format!("Invalid DATABASE_BINDINGS entry: {entry:?}"));
        }
        bindings.insert(name.to_string(), path.to_string());
    }
    if bindings.is_empty() {
        return Err("DATABASE_BINDINGS contains no bindings".to_string());
    }
    Ok(bindings)
}
