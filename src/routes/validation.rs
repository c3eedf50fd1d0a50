use crate::constants::{ERR_INVALID_BACKUP_NAME, ERR_INVALID_DATABASE_ID, MAX_IDENTIFIER_LEN};
use crate::error::{AppError, Result};

/// Check a database or backup identifier against the allowed pattern:
/// ASCII letters, digits, '.', '_' and '-', at most [`MAX_IDENTIFIER_LEN`]
/// characters. Path separators are excluded so identifiers map cleanly onto
/// blob keys.
pub fn is_valid_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_IDENTIFIER_LEN
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub fn validate_database_id(value: &str) -> Result<()> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(ERR_INVALID_DATABASE_ID.to_string()))
    }
}

pub fn validate_backup_name(value: &str) -> Result<()> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(ERR_INVALID_BACKUP_NAME.to_string()))
    }
}
