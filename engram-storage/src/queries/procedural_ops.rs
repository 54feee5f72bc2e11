//! Procedural memory persistence.

use rusqlite::{params, Connection, Row};

use engram_core::models::ProceduralMemory;
use engram_core::EngramResult;

use crate::to_storage_err;
use crate::vector::{cosine_similarity, to_blob};

use super::{embedding_col, json_col, to_json_string, ts};

const COLUMNS: &str = "memory_id, user_id, trigger_pattern, trigger_features, \
     action_heuristic, action_structure, embedding, confidence, observed_count, \
     created_at, updated_at";

fn row_to_procedural(row: &Row<'_>) -> rusqlite::Result<ProceduralMemory> {
    Ok(ProceduralMemory {
        memory_id: row.get(0)?,
        user_id: row.get(1)?,
        trigger_pattern: row.get(2)?,
        trigger_features: json_col(row, 3)?,
        action_heuristic: row.get(4)?,
        action_structure: json_col(row, 5)?,
        embedding: embedding_col(row, 6)?,
        confidence: row.get(7)?,
        observed_count: row.get(8)?,
        created_at: ts(row, 9)?,
        updated_at: ts(row, 10)?,
    })
}

pub fn create(conn: &Connection, memory: &ProceduralMemory) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO procedural_memories (
            memory_id, user_id, trigger_pattern, trigger_features, action_heuristic,
            action_structure, embedding, confidence, observed_count, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            memory.memory_id,
            memory.user_id,
            memory.trigger_pattern,
            to_json_string(&memory.trigger_features),
            memory.action_heuristic,
            to_json_string(&memory.action_structure),
            to_blob(&memory.embedding),
            memory.confidence,
            memory.observed_count,
            memory.created_at.to_rfc3339(),
            memory.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn find_similar(
    conn: &Connection,
    embedding: &[f32],
    limit: usize,
    user_id: &str,
) -> EngramResult<Vec<(ProceduralMemory, f64)>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM procedural_memories WHERE user_id = ?1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![user_id], row_to_procedural)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored: Vec<(ProceduralMemory, f64)> = rows
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

pub fn update(conn: &Connection, memory: &ProceduralMemory) -> EngramResult<()> {
    conn.execute(
        "UPDATE procedural_memories SET
            trigger_pattern = ?2, trigger_features = ?3, action_heuristic = ?4,
            action_structure = ?5, confidence = ?6, observed_count = ?7,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE memory_id = ?1",
        params![
            memory.memory_id,
            memory.trigger_pattern,
            to_json_string(&memory.trigger_features),
            memory.action_heuristic,
            to_json_string(&memory.action_structure),
            memory.confidence,
            memory.observed_count,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
