mod backup;
mod health;
mod restore;
pub mod validation;

pub use backup::{create_backup, list_backups, CreateBackupRequest};
pub use health::health_check;
pub use restore::{restore_backup, RestoreBackupRequest, RestoreBackupResponse};
