//! Per-table query modules plus shared row-conversion helpers.

pub mod conflict_ops;
pub mod config_ops;
pub mod entity_ops;
pub mod episodic_ops;
pub mod event_ops;
pub mod ontology_ops;
pub mod procedural_ops;
pub mod semantic_ops;
pub mod summary_ops;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;

fn conv_err(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// RFC 3339 timestamp column.
pub(crate) fn ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conv_err(idx, e))
}

/// Nullable RFC 3339 timestamp column.
pub(crate) fn opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    match s {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| conv_err(idx, e)),
    }
}

/// JSON-typed column deserialized into `T`.
pub(crate) fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| conv_err(idx, e))
}

/// snake_case enum column deserialized via serde.
pub(crate) fn enum_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    serde_json::from_value(serde_json::Value::String(s)).map_err(|e| conv_err(idx, e))
}

/// Nullable snake_case enum column.
pub(crate) fn opt_enum_col<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let s: Option<String> = row.get(idx)?;
    match s {
        None => Ok(None),
        Some(s) => serde_json::from_value(serde_json::Value::String(s))
            .map(Some)
            .map_err(|e| conv_err(idx, e)),
    }
}

/// Embedding blob column.
pub(crate) fn embedding_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<f32>> {
    let bytes: Vec<u8> = row.get(idx)?;
    crate::vector::from_blob(&bytes).ok_or_else(|| {
        conv_err(
            idx,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt embedding blob"),
        )
    })
}

/// Serialize a serde value for a JSON column.
pub(crate) fn to_json_string<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// snake_case name of an enum value, for TEXT columns.
pub(crate) fn enum_str<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}
