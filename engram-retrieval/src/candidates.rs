//! Candidate generation across the memory layers, in parallel, deduplicated
//! by `(layer, memory_id)`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use engram_core::config::Heuristics;
use engram_core::models::{
    EpisodicMemory, MemoryLayer, MemorySummary, Provenance, SemanticMemory, SummaryScope,
};
use engram_core::traits::{MemoryStore, SemanticFilter};
use engram_core::EngramResult;

use engram_lifecycle::decay;
use engram_storage::vector::cosine_similarity;

use crate::scoring::Candidate;

/// Per-layer fetch width; the scorer narrows to top_k afterwards.
const LAYER_LIMIT: usize = 20;

/// Generate candidates from the semantic (vector + entity), episodic, and
/// summary layers. `created_before` excludes this turn's own writes.
pub async fn generate(
    store: &Arc<dyn MemoryStore>,
    query_embedding: Option<&[f32]>,
    query_entities: &[String],
    user_id: &str,
    created_before: Option<DateTime<Utc>>,
    heuristics: &Heuristics,
    now: DateTime<Utc>,
) -> EngramResult<Vec<Candidate>> {
    let filter = SemanticFilter {
        user_id: Some(user_id.to_string()),
        subject_entity_id: None,
        statuses: Vec::new(),
        created_before,
    };

    // The three vector probes and the entity probe are independent.
    let (semantic_vec, episodic_vec, summary_vec, semantic_ent) = match query_embedding {
        Some(embedding) => tokio::join!(
            store.semantic_similar(embedding, LAYER_LIMIT, &filter),
            store.episodic_similar(embedding, LAYER_LIMIT, user_id),
            store.summary_similar(embedding, LAYER_LIMIT, user_id),
            store.semantic_by_entities(query_entities, user_id, LAYER_LIMIT),
        ),
        None => {
            // Query embedding unavailable: entity-driven retrieval only.
            let by_entities = store
                .semantic_by_entities(query_entities, user_id, LAYER_LIMIT)
                .await;
            (Ok(Vec::new()), Ok(Vec::new()), Ok(Vec::new()), by_entities)
        }
    };

    let mut seen: HashSet<(MemoryLayer, String)> = HashSet::new();
    let mut candidates = Vec::new();

    for (memory, similarity) in semantic_vec? {
        if seen.insert((MemoryLayer::Semantic, memory.memory_id.clone())) {
            candidates.push(semantic_candidate(memory, similarity, heuristics, now));
        }
    }

    for memory in semantic_ent? {
        if created_before.is_some_and(|cutoff| memory.created_at >= cutoff) {
            continue;
        }
        if memory.status.is_terminal() {
            continue;
        }
        if seen.insert((MemoryLayer::Semantic, memory.memory_id.clone())) {
            let similarity = query_embedding
                .map(|q| cosine_similarity(&memory.embedding, q))
                .unwrap_or(0.0);
            candidates.push(semantic_candidate(memory, similarity, heuristics, now));
        }
    }

    for (memory, similarity) in episodic_vec? {
        if created_before.is_some_and(|cutoff| memory.created_at >= cutoff) {
            continue;
        }
        if seen.insert((MemoryLayer::Episodic, memory.memory_id.clone())) {
            candidates.push(episodic_candidate(memory, similarity));
        }
    }

    for (summary, similarity) in summary_vec? {
        if created_before.is_some_and(|cutoff| summary.created_at >= cutoff) {
            continue;
        }
        if seen.insert((MemoryLayer::Summary, summary.summary_id.clone())) {
            candidates.push(summary_candidate(summary, similarity));
        }
    }

    Ok(candidates)
}

fn semantic_candidate(
    memory: SemanticMemory,
    similarity: f64,
    heuristics: &Heuristics,
    now: DateTime<Utc>,
) -> Candidate {
    let effective =
        decay::effective_confidence(&memory, now, heuristics.confidence.decay_per_day);
    let mut entities = memory.related_entities.clone();
    if !entities.contains(&memory.subject_entity_id) {
        entities.push(memory.subject_entity_id.clone());
    }
    Candidate {
        memory_id: memory.memory_id.clone(),
        layer: MemoryLayer::Semantic,
        original_text: memory.original_text.clone(),
        entities,
        created_at: memory.created_at,
        importance: effective,
        reinforcement_count: memory.reinforcement_count,
        similarity,
        effective_confidence: effective,
        provenance: Provenance {
            memory_id: memory.memory_id,
            extracted_from_event_id: memory.extracted_from_event_id,
            source_memory_id: memory.source_memory_id,
        },
    }
}

fn episodic_candidate(memory: EpisodicMemory, similarity: f64) -> Candidate {
    Candidate {
        memory_id: memory.memory_id.clone(),
        layer: MemoryLayer::Episodic,
        original_text: memory.summary.clone(),
        entities: memory.entities.clone(),
        created_at: memory.created_at,
        importance: memory.importance,
        reinforcement_count: 0,
        similarity,
        effective_confidence: memory.importance,
        provenance: Provenance {
            memory_id: memory.memory_id,
            extracted_from_event_id: Some(memory.source_event_id),
            source_memory_id: None,
        },
    }
}

fn summary_candidate(summary: MemorySummary, similarity: f64) -> Candidate {
    let entities = match summary.scope_type {
        SummaryScope::Entity => vec![summary.scope_identifier.clone()],
        _ => Vec::new(),
    };
    Candidate {
        memory_id: summary.summary_id.clone(),
        layer: MemoryLayer::Summary,
        original_text: summary.summary_text.clone(),
        entities,
        created_at: summary.created_at,
        importance: 1.0,
        reinforcement_count: 0,
        similarity,
        effective_confidence: 1.0,
        provenance: Provenance {
            memory_id: summary.summary_id,
            extracted_from_event_id: None,
            source_memory_id: summary.source_data.episodic_ids.first().cloned(),
        },
    }
}
