//! Episodic memory persistence.

use rusqlite::{params, Connection, OptionalExtension, Row};

use engram_core::models::EpisodicMemory;
use engram_core::EngramResult;

use crate::to_storage_err;
use crate::vector::{cosine_similarity, to_blob};

use super::{embedding_col, json_col, to_json_string, ts};

const COLUMNS: &str = "memory_id, user_id, session_id, summary, entities, embedding, \
     importance, source_event_id, created_at, updated_at";

fn row_to_episodic(row: &Row<'_>) -> rusqlite::Result<EpisodicMemory> {
    Ok(EpisodicMemory {
        memory_id: row.get(0)?,
        user_id: row.get(1)?,
        session_id: row.get(2)?,
        summary: row.get(3)?,
        entities: json_col(row, 4)?,
        embedding: embedding_col(row, 5)?,
        importance: row.get(6)?,
        source_event_id: row.get(7)?,
        created_at: ts(row, 8)?,
        updated_at: ts(row, 9)?,
    })
}

pub fn create(conn: &Connection, memory: &EpisodicMemory) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO episodic_memories (
            memory_id, user_id, session_id, summary, entities, embedding,
            importance, source_event_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            memory.memory_id,
            memory.user_id,
            memory.session_id,
            memory.summary,
            to_json_string(&memory.entities),
            to_blob(&memory.embedding),
            memory.importance,
            memory.source_event_id,
            memory.created_at.to_rfc3339(),
            memory.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn by_entities(
    conn: &Connection,
    entity_ids: &[String],
    user_id: &str,
    limit: usize,
) -> EngramResult<Vec<EpisodicMemory>> {
    if entity_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM episodic_memories
             WHERE user_id = ?1 ORDER BY created_at DESC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![user_id], row_to_episodic)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut matched: Vec<EpisodicMemory> = rows
        .into_iter()
        .filter(|m| m.entities.iter().any(|e| entity_ids.contains(e)))
        .collect();
    matched.truncate(limit);
    Ok(matched)
}

pub fn get(conn: &Connection, memory_id: &str) -> EngramResult<Option<EpisodicMemory>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM episodic_memories WHERE memory_id = ?1"),
        params![memory_id],
        row_to_episodic,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Newest-first episodes of one session.
pub fn by_session(
    conn: &Connection,
    session_id: &str,
    limit: usize,
) -> EngramResult<Vec<EpisodicMemory>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM episodic_memories
             WHERE session_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![session_id, limit as i64], row_to_episodic)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows)
}

pub fn find_similar(
    conn: &Connection,
    embedding: &[f32],
    limit: usize,
    user_id: &str,
) -> EngramResult<Vec<(EpisodicMemory, f64)>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM episodic_memories WHERE user_id = ?1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![user_id], row_to_episodic)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored: Vec<(EpisodicMemory, f64)> = rows
        .into_iter()
        .map(|m| {
            let sim = cosine_similarity(&m.embedding, embedding);
            (m, sim)
        })
        .filter(|(_, sim)| sim.is_finite())
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    Ok(scored)
}

/// Importance attenuation after consolidation; the episode stays, it just
/// falls below retrieval cutoffs.
pub fn update(conn: &Connection, memory: &EpisodicMemory) -> EngramResult<()> {
    conn.execute(
        "UPDATE episodic_memories SET
            summary = ?2, entities = ?3, importance = ?4,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE memory_id = ?1",
        params![
            memory.memory_id,
            memory.summary,
            to_json_string(&memory.entities),
            memory.importance,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
