//! Semantic memory persistence: structured lookup by (subject, predicate),
//! vector similarity, reinforcement candidates, and optimistic update.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use engram_core::models::{MemoryStatus, SemanticMemory};
use engram_core::traits::SemanticFilter;
use engram_core::EngramResult;

use crate::to_storage_err;
use crate::vector::{cosine_similarity, to_blob};

use super::{embedding_col, enum_col, enum_str, json_col, to_json_string, ts};

const COLUMNS: &str = "memory_id, user_id, subject_entity_id, predicate, predicate_type, \
     object_value, original_text, source_text, related_entities, embedding, confidence, \
     confidence_factors, reinforcement_count, status, last_validated_at, \
     extracted_from_event_id, source_memory_id, superseded_by_memory_id, created_at, updated_at";

fn row_to_semantic(row: &Row<'_>) -> rusqlite::Result<SemanticMemory> {
    Ok(SemanticMemory {
        memory_id: row.get(0)?,
        user_id: row.get(1)?,
        subject_entity_id: row.get(2)?,
        predicate: row.get(3)?,
        predicate_type: enum_col(row, 4)?,
        object_value: json_col(row, 5)?,
        original_text: row.get(6)?,
        source_text: row.get(7)?,
        related_entities: json_col(row, 8)?,
        embedding: embedding_col(row, 9)?,
        confidence: row.get(10)?,
        confidence_factors: json_col(row, 11)?,
        reinforcement_count: row.get(12)?,
        status: enum_col(row, 13)?,
        last_validated_at: ts(row, 14)?,
        extracted_from_event_id: row.get(15)?,
        source_memory_id: row.get(16)?,
        superseded_by_memory_id: row.get(17)?,
        created_at: ts(row, 18)?,
        updated_at: ts(row, 19)?,
    })
}

pub fn create(conn: &Connection, memory: &SemanticMemory) -> EngramResult<()> {
    debug_assert!(memory.supersession_is_consistent());
    conn.execute(
        "INSERT INTO semantic_memories (
            memory_id, user_id, subject_entity_id, predicate, predicate_type,
            object_value, original_text, source_text, related_entities, embedding,
            confidence, confidence_factors, reinforcement_count, status,
            last_validated_at, extracted_from_event_id, source_memory_id,
            superseded_by_memory_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                  ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            memory.memory_id,
            memory.user_id,
            memory.subject_entity_id,
            memory.predicate,
            enum_str(&memory.predicate_type),
            to_json_string(&memory.object_value),
            memory.original_text,
            memory.source_text,
            to_json_string(&memory.related_entities),
            to_blob(&memory.embedding),
            memory.confidence,
            to_json_string(&memory.confidence_factors),
            memory.reinforcement_count,
            enum_str(&memory.status),
            memory.last_validated_at.to_rfc3339(),
            memory.extracted_from_event_id,
            memory.source_memory_id,
            memory.superseded_by_memory_id,
            memory.created_at.to_rfc3339(),
            memory.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get(conn: &Connection, memory_id: &str) -> EngramResult<Option<SemanticMemory>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM semantic_memories WHERE memory_id = ?1"),
        params![memory_id],
        row_to_semantic,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Active + aging memories with the same structured key, for conflict
/// detection.
pub fn by_subject_predicate(
    conn: &Connection,
    subject_entity_id: &str,
    predicate: &str,
    user_id: &str,
) -> EngramResult<Vec<SemanticMemory>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM semantic_memories
             WHERE subject_entity_id = ?1 AND predicate = ?2 AND user_id = ?3
               AND status IN ('active', 'aging')
             ORDER BY created_at DESC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let memories = stmt
        .query_map(params![subject_entity_id, predicate, user_id], row_to_semantic)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(memories)
}

/// Vector similarity over the filtered candidate set, computed in-process.
pub fn find_similar(
    conn: &Connection,
    embedding: &[f32],
    limit: usize,
    filter: &SemanticFilter,
) -> EngramResult<Vec<(SemanticMemory, f64)>> {
    let statuses: Vec<MemoryStatus> = if filter.statuses.is_empty() {
        vec![MemoryStatus::Active, MemoryStatus::Aging]
    } else {
        filter.statuses.clone()
    };

    let mut stmt = conn
        .prepare(&format!("SELECT {COLUMNS} FROM semantic_memories"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], row_to_semantic)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored: Vec<(SemanticMemory, f64)> = rows
        .into_iter()
        .filter(|m| statuses.contains(&m.status))
        .filter(|m| {
            filter
                .user_id
                .as_deref()
                .map_or(true, |uid| m.user_id == uid)
        })
        .filter(|m| {
            filter
                .subject_entity_id
                .as_deref()
                .map_or(true, |sid| m.subject_entity_id == sid)
        })
        .filter(|m| {
            filter
                .created_before
                .map_or(true, |cutoff| m.created_at < cutoff)
        })
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

/// Memories whose `related_entities` intersect the given ids.
pub fn by_entities(
    conn: &Connection,
    entity_ids: &[String],
    user_id: &str,
    limit: usize,
) -> EngramResult<Vec<SemanticMemory>> {
    if entity_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM semantic_memories
             WHERE user_id = ?1 AND status IN ('active', 'aging')
             ORDER BY created_at DESC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![user_id], row_to_semantic)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut matched: Vec<SemanticMemory> = rows
        .into_iter()
        .filter(|m| {
            entity_ids.contains(&m.subject_entity_id)
                || m.related_entities.iter().any(|e| entity_ids.contains(e))
        })
        .collect();
    matched.truncate(limit);
    Ok(matched)
}

/// Equivalent active memories (same subject + predicate), excluding one id.
pub fn find_reinforcements(
    conn: &Connection,
    subject_entity_id: &str,
    predicate: &str,
    exclude_id: &str,
) -> EngramResult<Vec<SemanticMemory>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM semantic_memories
             WHERE subject_entity_id = ?1 AND predicate = ?2 AND memory_id != ?3
               AND status = 'active'"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let memories = stmt
        .query_map(params![subject_entity_id, predicate, exclude_id], row_to_semantic)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(memories)
}

/// Optimistic update keyed on `(memory_id, updated_at)`. Returns `false`
/// when the stored row has moved on since the caller's read.
pub fn update(conn: &Connection, memory: &SemanticMemory) -> EngramResult<bool> {
    debug_assert!(memory.supersession_is_consistent());
    let new_updated_at = Utc::now();
    let rows = conn
        .execute(
            "UPDATE semantic_memories SET
                object_value = ?3, original_text = ?4, related_entities = ?5,
                embedding = ?6, confidence = ?7, confidence_factors = ?8,
                reinforcement_count = ?9, status = ?10, last_validated_at = ?11,
                superseded_by_memory_id = ?12, updated_at = ?13
             WHERE memory_id = ?1 AND updated_at = ?2",
            params![
                memory.memory_id,
                memory.updated_at.to_rfc3339(),
                to_json_string(&memory.object_value),
                memory.original_text,
                to_json_string(&memory.related_entities),
                to_blob(&memory.embedding),
                memory.confidence,
                to_json_string(&memory.confidence_factors),
                memory.reinforcement_count,
                enum_str(&memory.status),
                memory.last_validated_at.to_rfc3339(),
                memory.superseded_by_memory_id,
                new_updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows == 1)
}
