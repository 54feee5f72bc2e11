//! Active validation: stale low-confidence memories earn a validation
//! question; user confirmation or rejection closes the loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use engram_core::config::Heuristics;
use engram_core::models::{MemoryStatus, SemanticMemory};
use engram_core::traits::MemoryStore;
use engram_core::{EngramError, EngramResult};

use crate::decay;

/// True when the memory is both stale and below the confidence floor.
pub fn needs_validation(memory: &SemanticMemory, heuristics: &Heuristics, now: DateTime<Utc>) -> bool {
    let days = decay::days_since(memory.last_validated_at, now);
    if days <= heuristics.validation.stale_days as f64 {
        return false;
    }
    let effective = decay::effective_confidence(memory, now, heuristics.confidence.decay_per_day);
    effective < heuristics.validation.low_confidence
}

/// The question appended to the reply context.
pub fn validation_prompt(memory: &SemanticMemory) -> String {
    let object = match &memory.object_value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    format!("Is {}: {} still accurate?", memory.predicate, object)
}

/// `active → aging` when effective confidence has sunk below the floor.
/// Persists the transition; returns the possibly-updated memory.
pub async fn age_if_needed(
    store: &Arc<dyn MemoryStore>,
    memory: SemanticMemory,
    heuristics: &Heuristics,
    now: DateTime<Utc>,
) -> EngramResult<SemanticMemory> {
    if memory.status != MemoryStatus::Active {
        return Ok(memory);
    }
    let effective = decay::effective_confidence(&memory, now, heuristics.confidence.decay_per_day);
    if effective >= heuristics.validation.low_confidence {
        return Ok(memory);
    }
    let mut aged = memory;
    aged.status = MemoryStatus::Aging;
    if store.update_semantic(&aged).await? {
        tracing::info!(target: "engram_lifecycle", memory_id = %aged.memory_id, "memory aged");
        Ok(aged)
    } else {
        // Lost the race; the stored row is newer. Return it as-is.
        let id = aged.memory_id.clone();
        store.get_semantic(&id).await?.ok_or_else(|| {
            EngramError::Storage(engram_core::errors::StorageError::NotFound {
                kind: "semantic_memory",
                id,
            })
        })
    }
}

/// User confirmed the fact: stamp the validation clock; `aging → active`.
pub async fn confirm_memory(
    store: &Arc<dyn MemoryStore>,
    memory_id: &str,
) -> EngramResult<Option<SemanticMemory>> {
    let Some(mut memory) = store.get_semantic(memory_id).await? else {
        return Ok(None);
    };
    if memory.status.is_terminal() {
        return Ok(Some(memory));
    }
    memory.last_validated_at = Utc::now();
    memory.status = MemoryStatus::Active;
    if !store.update_semantic(&memory).await? {
        tracing::warn!(target: "engram_lifecycle", memory_id, "confirm lost optimistic race");
        return store.get_semantic(memory_id).await;
    }
    tracing::info!(target: "engram_lifecycle", memory_id, "memory confirmed by user");
    Ok(Some(memory))
}

/// User rejected the fact: `active|aging → invalidated` (terminal).
pub async fn reject_memory(
    store: &Arc<dyn MemoryStore>,
    memory_id: &str,
) -> EngramResult<Option<SemanticMemory>> {
    let Some(mut memory) = store.get_semantic(memory_id).await? else {
        return Ok(None);
    };
    if memory.status.is_terminal() {
        return Ok(Some(memory));
    }
    memory.status = MemoryStatus::Invalidated;
    if !store.update_semantic(&memory).await? {
        tracing::warn!(target: "engram_lifecycle", memory_id, "reject lost optimistic race");
        return store.get_semantic(memory_id).await;
    }
    tracing::info!(target: "engram_lifecycle", memory_id, "memory invalidated by user");
    Ok(Some(memory))
}
