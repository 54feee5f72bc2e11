//! Summary memory persistence.

use rusqlite::{params, Connection, OptionalExtension, Row};

use engram_core::models::{MemorySummary, SourceData, SummaryScope};
use engram_core::EngramResult;

use crate::to_storage_err;
use crate::vector::{cosine_similarity, to_blob};

use super::{embedding_col, enum_col, enum_str, json_col, to_json_string, ts};

const COLUMNS: &str = "summary_id, user_id, scope_type, scope_identifier, summary_text, \
     key_facts, source_episodic, source_semantic, embedding, created_at, updated_at";

fn row_to_summary(row: &Row<'_>) -> rusqlite::Result<MemorySummary> {
    Ok(MemorySummary {
        summary_id: row.get(0)?,
        user_id: row.get(1)?,
        scope_type: enum_col(row, 2)?,
        scope_identifier: row.get(3)?,
        summary_text: row.get(4)?,
        key_facts: json_col(row, 5)?,
        source_data: SourceData {
            episodic_ids: json_col(row, 6)?,
            semantic_ids: json_col(row, 7)?,
        },
        embedding: embedding_col(row, 8)?,
        created_at: ts(row, 9)?,
        updated_at: ts(row, 10)?,
    })
}

pub fn create(conn: &Connection, summary: &MemorySummary) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO memory_summaries (
            summary_id, user_id, scope_type, scope_identifier, summary_text,
            key_facts, source_episodic, source_semantic, embedding, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            summary.summary_id,
            summary.user_id,
            enum_str(&summary.scope_type),
            summary.scope_identifier,
            summary.summary_text,
            to_json_string(&summary.key_facts),
            to_json_string(&summary.source_data.episodic_ids),
            to_json_string(&summary.source_data.semantic_ids),
            to_blob(&summary.embedding),
            summary.created_at.to_rfc3339(),
            summary.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Latest summary for a scope, if any.
pub fn by_scope(
    conn: &Connection,
    scope_type: SummaryScope,
    scope_identifier: &str,
    user_id: &str,
) -> EngramResult<Option<MemorySummary>> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM memory_summaries
             WHERE scope_type = ?1 AND scope_identifier = ?2 AND user_id = ?3
             ORDER BY created_at DESC LIMIT 1"
        ),
        params![enum_str(&scope_type), scope_identifier, user_id],
        row_to_summary,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn find_similar(
    conn: &Connection,
    embedding: &[f32],
    limit: usize,
    user_id: &str,
) -> EngramResult<Vec<(MemorySummary, f64)>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM memory_summaries WHERE user_id = ?1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![user_id], row_to_summary)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored: Vec<(MemorySummary, f64)> = rows
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
