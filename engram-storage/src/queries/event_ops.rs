//! Append-only chat event log. Idempotent on content_hash.

use rusqlite::{params, Connection, OptionalExtension, Row};

use engram_core::models::{ChatEvent, ChatRole};
use engram_core::EngramResult;

use crate::to_storage_err;

use super::{enum_col, enum_str, json_col, to_json_string, ts};

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<ChatEvent> {
    Ok(ChatEvent {
        event_id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        role: enum_col::<ChatRole>(row, 3)?,
        content: row.get(4)?,
        content_hash: row.get(5)?,
        metadata: json_col(row, 6)?,
        created_at: ts(row, 7)?,
    })
}

const COLUMNS: &str =
    "event_id, session_id, user_id, role, content, content_hash, metadata, created_at";

/// Insert an event, returning the stored row. A duplicate `content_hash`
/// returns the previously stored event unchanged.
pub fn append(conn: &Connection, event: &ChatEvent) -> EngramResult<ChatEvent> {
    let inserted = conn
        .execute(
            "INSERT INTO chat_events (
                event_id, session_id, user_id, role, content, content_hash, metadata, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(content_hash) DO NOTHING",
            params![
                event.event_id,
                event.session_id,
                event.user_id,
                enum_str(&event.role),
                event.content,
                event.content_hash,
                to_json_string(&event.metadata),
                event.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    if inserted == 0 {
        tracing::debug!(target: "engram_storage", hash = %event.content_hash, "duplicate ingest, returning stored event");
    }

    get_by_hash(conn, &event.content_hash)?.ok_or_else(|| {
        to_storage_err(format!(
            "event with hash {} vanished after insert",
            event.content_hash
        ))
    })
}

pub fn get(conn: &Connection, event_id: &str) -> EngramResult<Option<ChatEvent>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM chat_events WHERE event_id = ?1"),
        params![event_id],
        row_to_event,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn get_by_hash(conn: &Connection, content_hash: &str) -> EngramResult<Option<ChatEvent>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM chat_events WHERE content_hash = ?1"),
        params![content_hash],
        row_to_event,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Most recent events of a session, oldest first.
pub fn session_events(
    conn: &Connection,
    session_id: &str,
    limit: usize,
) -> EngramResult<Vec<ChatEvent>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM (
                SELECT {COLUMNS} FROM chat_events
                WHERE session_id = ?1
                ORDER BY created_at DESC
                LIMIT ?2
            ) ORDER BY created_at ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let events = stmt
        .query_map(params![session_id, limit as i64], row_to_event)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(events)
}
