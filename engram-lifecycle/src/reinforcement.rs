//! Reinforcement on equivalent re-observation. Diminishing returns by
//! construction: the schedule's last entry repeats for all later
//! observations.

use std::sync::Arc;

use chrono::Utc;

use engram_core::config::ConfidenceHeuristics;
use engram_core::errors::StorageError;
use engram_core::models::SemanticMemory;
use engram_core::traits::MemoryStore;
use engram_core::{EngramError, EngramResult};

/// The boost for the nth reinforcement (0-based).
pub fn boost_for(count: u32, schedule: &[f64]) -> f64 {
    if schedule.is_empty() {
        return 0.0;
    }
    let idx = (count as usize).min(schedule.len() - 1);
    schedule[idx]
}

/// Apply one reinforcement in place: confidence up (clamped), count up,
/// `last_validated_at` refreshed.
pub fn apply(memory: &mut SemanticMemory, heuristics: &ConfidenceHeuristics) {
    let boost = boost_for(memory.reinforcement_count, &heuristics.reinforcement_schedule);
    memory.confidence = (memory.confidence + boost).min(heuristics.max);
    memory.reinforcement_count += 1;
    memory.last_validated_at = Utc::now();
}

/// Reinforce a stored memory under optimistic concurrency: on a lost update
/// the row is reread and the write retried once, then we give up and log.
pub async fn reinforce_stored(
    store: &Arc<dyn MemoryStore>,
    memory_id: &str,
    heuristics: &ConfidenceHeuristics,
) -> EngramResult<Option<SemanticMemory>> {
    for attempt in 0..2 {
        let Some(mut memory) = store.get_semantic(memory_id).await? else {
            return Ok(None);
        };
        apply(&mut memory, heuristics);
        if store.update_semantic(&memory).await? {
            tracing::debug!(
                target: "engram_lifecycle",
                memory_id,
                confidence = memory.confidence,
                count = memory.reinforcement_count,
                "reinforced"
            );
            return Ok(Some(memory));
        }
        tracing::warn!(target: "engram_lifecycle", memory_id, attempt, "optimistic update lost, retrying");
    }
    tracing::warn!(target: "engram_lifecycle", memory_id, "reinforcement abandoned after retry");
    Err(EngramError::Storage(StorageError::OptimisticLockLost {
        memory_id: memory_id.to_string(),
    }))
}
