//! Conflict records: append-only on detection, updated at most once.

use rusqlite::{params, Connection, Row};

use engram_core::models::MemoryConflict;
use engram_core::EngramResult;

use crate::to_storage_err;

use super::{json_col, opt_enum_col, opt_ts, to_json_string, ts};

const COLUMNS: &str = "conflict_id, conflict_type, conflict_data, resolution_strategy, \
     resolution_outcome, detected_at, resolved_at";

fn row_to_conflict(row: &Row<'_>) -> rusqlite::Result<MemoryConflict> {
    let outcome_json: Option<String> = row.get(4)?;
    let resolution_outcome = match outcome_json {
        None => None,
        Some(s) => serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
    };
    Ok(MemoryConflict {
        conflict_id: row.get(0)?,
        conflict_type: super::enum_col(row, 1)?,
        conflict_data: json_col(row, 2)?,
        resolution_strategy: opt_enum_col(row, 3)?,
        resolution_outcome,
        detected_at: ts(row, 5)?,
        resolved_at: opt_ts(row, 6)?,
    })
}

pub fn create(conn: &Connection, conflict: &MemoryConflict) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO memory_conflicts (
            conflict_id, conflict_type, conflict_data, resolution_strategy,
            resolution_outcome, detected_at, resolved_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            conflict.conflict_id,
            super::enum_str(&conflict.conflict_type),
            to_json_string(&conflict.conflict_data),
            conflict.resolution_strategy.map(|s| s.as_str()),
            conflict
                .resolution_outcome
                .as_ref()
                .map(to_json_string),
            conflict.detected_at.to_rfc3339(),
            conflict.resolved_at.map(|t| t.to_rfc3339()),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn update(conn: &Connection, conflict: &MemoryConflict) -> EngramResult<()> {
    conn.execute(
        "UPDATE memory_conflicts SET
            resolution_strategy = ?2, resolution_outcome = ?3, resolved_at = ?4
         WHERE conflict_id = ?1",
        params![
            conflict.conflict_id,
            conflict.resolution_strategy.map(|s| s.as_str()),
            conflict
                .resolution_outcome
                .as_ref()
                .map(to_json_string),
            conflict.resolved_at.map(|t| t.to_rfc3339()),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn unresolved(conn: &Connection) -> EngramResult<Vec<MemoryConflict>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM memory_conflicts
             WHERE resolved_at IS NULL ORDER BY detected_at ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let conflicts = stmt
        .query_map([], row_to_conflict)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(conflicts)
}
