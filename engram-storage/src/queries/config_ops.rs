//! system_config key-value table: persisted heuristic overrides and
//! deployment metadata.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::EngramResult;

use crate::to_storage_err;

pub fn get(conn: &Connection, key: &str) -> EngramResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM system_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn set(conn: &Connection, key: &str, value: &str) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO system_config (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![key, value],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
