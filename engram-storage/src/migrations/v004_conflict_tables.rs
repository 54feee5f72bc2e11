//! v004: conflict records. Append-only during detection, updated at most
//! once on resolution.

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE memory_conflicts (
            conflict_id          TEXT PRIMARY KEY,
            conflict_type        TEXT NOT NULL,
            conflict_data        TEXT NOT NULL DEFAULT '{}',
            resolution_strategy  TEXT,
            resolution_outcome   TEXT,
            detected_at          TEXT NOT NULL,
            resolved_at          TEXT
        );
        CREATE INDEX idx_conflicts_unresolved
            ON memory_conflicts(detected_at) WHERE resolved_at IS NULL;",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
