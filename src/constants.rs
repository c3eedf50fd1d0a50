/// Name of the control document object within a backup
pub const METADATA_OBJECT_NAME: &str = "metadata.json";

/// Suffix appended to a table name to form its data object name
pub const TABLE_OBJECT_SUFFIX: &str = ".json";

/// Content type used for every object written to the blob store
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Table-name prefixes excluded from introspection.
/// `sqlite_` covers the engine's own catalog objects; `_cf_` covers
/// platform-reserved bookkeeping tables.
pub const RESERVED_TABLE_PREFIXES: &[&str] = &["sqlite_", "_cf_"];

/// Backup-name suffixes that select the sequential (archive) restore variant
pub const TAR_SUFFIX: &str = ".tar";
pub const TGZ_SUFFIX: &str = ".tgz";

/// Maximum length of a database or backup identifier
pub const MAX_IDENTIFIER_LEN: usize = 128;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for invalid database identifier format
pub const ERR_INVALID_DATABASE_ID: &str =
    "Invalid database identifier: letters, digits, '.', '_' and '-' only";

/// Error message for invalid backup name format
pub const ERR_INVALID_BACKUP_NAME: &str =
    "Invalid backup name: letters, digits, '.', '_' and '-' only";
