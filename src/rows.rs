//! Row-level plumbing shared by the backup writer and the table
//! materializer: SQL identifier quoting, encoding SQLite rows into the JSON
//! table-data documents, and binding decoded JSON values back onto
//! parameterized statements.

use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, TypeInfo, ValueRef};

use crate::error::{AppError, Result};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Quote an identifier for direct inclusion in SQL text.
///
/// Needed because table and column names cannot be bound as parameters.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `SELECT "c1", "c2", ... FROM "T"` with the columns in recorded order.
///
/// Never `SELECT *`: restore re-binds values positionally, so the export
/// order must be exactly the recorded column order.
pub fn select_sql(table: &str, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {}", column_list, quote_ident(table))
}

/// `INSERT INTO "T" ("c1", ...) VALUES (?, ...)` with one positional
/// placeholder per column
pub fn insert_sql(table: &str, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list,
        placeholders
    )
}

/// Encode one fetched row as a JSON row-array, positionally aligned to the
/// query's column order.
///
/// SQLite storage classes map as: NULL -> null, INTEGER -> number, REAL ->
/// number, TEXT -> string, BLOB -> array of byte values.
pub fn encode_row(row: &SqliteRow) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(row.len());

    for i in 0..row.len() {
        let raw = row.try_get_raw(i)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let storage_class = raw.type_info().name().to_string();

        let value = match storage_class.as_str() {
            "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(i)?),
            "REAL" => serde_json::Number::from_f64(row.try_get::<f64, _>(i)?)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            "BLOB" => Value::Array(
                row.try_get::<Vec<u8>, _>(i)?
                    .into_iter()
                    .map(Value::from)
                    .collect(),
            ),
            _ => Value::String(row.try_get::<String, _>(i)?),
        };
        values.push(value);
    }

    Ok(values)
}

/// Bind one decoded JSON value onto the next positional parameter
pub fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q Value) -> Result<SqliteQuery<'q>> {
    let query = match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64())
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        Value::Array(items) => {
            let mut bytes = Vec::with_capacity(items.len());
            for item in items {
                let byte = item
                    .as_u64()
                    .and_then(|u| u8::try_from(u).ok())
                    .ok_or_else(|| {
                        AppError::InvalidInput("Blob value contains a non-byte element".to_string())
                    })?;
                bytes.push(byte);
            }
            query.bind(bytes)
        }
        Value::Object(_) => {
            return Err(AppError::InvalidInput(
                "Row values may not be JSON objects".to_string(),
            ))
        }
    };

    Ok(query)
}
