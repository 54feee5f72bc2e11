//! v001: append-only chat event log.

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE chat_events (
            event_id     TEXT PRIMARY KEY,
            session_id   TEXT NOT NULL,
            user_id      TEXT NOT NULL,
            role         TEXT NOT NULL,
            content      TEXT NOT NULL,
            content_hash TEXT NOT NULL UNIQUE,
            metadata     TEXT NOT NULL DEFAULT '{}',
            created_at   TEXT NOT NULL
        );
        CREATE INDEX idx_chat_events_session ON chat_events(session_id, created_at);
        CREATE INDEX idx_chat_events_user ON chat_events(user_id, created_at);",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
