//! Conflict resolution. Strategies are auto-selected; conflicts are never
//! silently reconciled — detection appended the row, resolution updates it
//! exactly once with an outcome.

use std::sync::Arc;

use chrono::Utc;

use engram_core::config::HeuristicRegistry;
use engram_core::errors::LifecycleError;
use engram_core::models::{
    ConflictType, MemoryConflict, MemoryStatus, ResolutionOutcome, ResolutionStrategy,
    SemanticMemory,
};
use engram_core::traits::MemoryStore;
use engram_core::{EngramError, EngramResult};

/// Auto-select between `trust_reinforced` and `trust_recent` for a
/// memory-vs-memory conflict. The ratio is computed over observation counts
/// (reinforcements + the initial observation), so a single prior sighting
/// does not outweigh recency. `ask_user` is reserved and never auto-picked.
pub fn select_memory_strategy(r1: u32, r2: u32) -> ResolutionStrategy {
    let (hi, lo) = (r1.max(r2) + 1, r1.min(r2) + 1);
    if hi > 2 * lo {
        ResolutionStrategy::TrustReinforced
    } else {
        ResolutionStrategy::TrustRecent
    }
}

pub struct ConflictResolver {
    store: Arc<dyn MemoryStore>,
    #[allow(dead_code)]
    registry: Arc<HeuristicRegistry>,
}

impl ConflictResolver {
    pub fn new(store: Arc<dyn MemoryStore>, registry: Arc<HeuristicRegistry>) -> Self {
        Self { store, registry }
    }

    /// Resolve one detected conflict and record the outcome on its row.
    /// Returns the updated conflict.
    pub async fn resolve(&self, conflict: &MemoryConflict) -> EngramResult<MemoryConflict> {
        if conflict.is_resolved() {
            return Err(EngramError::Lifecycle(LifecycleError::AlreadyResolved {
                conflict_id: conflict.conflict_id.clone(),
            }));
        }
        match conflict.conflict_type {
            ConflictType::MemoryVsDb => self.resolve_vs_db(conflict).await,
            ConflictType::MemoryVsMemory => self.resolve_vs_memory(conflict).await,
        }
    }

    /// DB is authoritative: the memory is invalidated, always.
    async fn resolve_vs_db(&self, conflict: &MemoryConflict) -> EngramResult<MemoryConflict> {
        let memory_id = data_str(conflict, "memory_id")?;
        let memory = self.require_memory(&memory_id).await?;

        self.transition(
            memory,
            MemoryStatus::Invalidated,
            None,
        )
        .await?;

        let outcome = ResolutionOutcome {
            winner_id: "domain_db".to_string(),
            loser_id: memory_id.clone(),
            rationale: "domain database is authoritative for this predicate".to_string(),
        };
        self.record(conflict, ResolutionStrategy::TrustDb, outcome).await
    }

    async fn resolve_vs_memory(&self, conflict: &MemoryConflict) -> EngramResult<MemoryConflict> {
        let existing_id = data_str(conflict, "existing_memory_id")?;
        let new_id = data_str(conflict, "new_memory_id")?;
        let existing = self.require_memory(&existing_id).await?;
        let new = self.require_memory(&new_id).await?;

        let strategy =
            select_memory_strategy(existing.reinforcement_count, new.reinforcement_count);
        let (winner, loser) = match strategy {
            ResolutionStrategy::TrustReinforced => {
                if existing.reinforcement_count >= new.reinforcement_count {
                    (existing, new)
                } else {
                    (new, existing)
                }
            }
            // trust_recent: the newer observation wins.
            _ => {
                if new.created_at >= existing.created_at {
                    (new, existing)
                } else {
                    (existing, new)
                }
            }
        };

        // Supersession points forward in time; the loser is always older
        // than its winner's resolution, and a winner can never be its own
        // loser.
        if winner.memory_id == loser.memory_id {
            return Err(EngramError::Lifecycle(LifecycleError::MalformedConflict {
                conflict_id: conflict.conflict_id.clone(),
                detail: "winner and loser are the same memory".to_string(),
            }));
        }
        if strategy == ResolutionStrategy::TrustRecent && loser.created_at > winner.created_at {
            return Err(EngramError::Lifecycle(LifecycleError::BackwardSupersession {
                winner_id: winner.memory_id.clone(),
                loser_id: loser.memory_id.clone(),
            }));
        }

        let rationale = match strategy {
            ResolutionStrategy::TrustReinforced => format!(
                "{} observed {}x vs {}x",
                winner.memory_id, winner.reinforcement_count, loser.reinforcement_count
            ),
            _ => format!("{} is the more recent observation", winner.memory_id),
        };

        let winner_id = winner.memory_id.clone();
        let loser_id = loser.memory_id.clone();
        self.transition(loser, MemoryStatus::Superseded, Some(winner_id.clone()))
            .await?;

        let outcome = ResolutionOutcome {
            winner_id,
            loser_id,
            rationale,
        };
        self.record(conflict, strategy, outcome).await
    }

    async fn require_memory(&self, memory_id: &str) -> EngramResult<SemanticMemory> {
        self.store.get_semantic(memory_id).await?.ok_or_else(|| {
            EngramError::Storage(engram_core::errors::StorageError::NotFound {
                kind: "semantic_memory",
                id: memory_id.to_string(),
            })
        })
    }

    /// Status write under optimistic concurrency, one retry.
    async fn transition(
        &self,
        mut memory: SemanticMemory,
        status: MemoryStatus,
        superseded_by: Option<String>,
    ) -> EngramResult<()> {
        for attempt in 0..2 {
            memory.status = status;
            memory.superseded_by_memory_id = superseded_by.clone();
            if self.store.update_semantic(&memory).await? {
                tracing::info!(
                    target: "engram_lifecycle",
                    memory_id = %memory.memory_id,
                    status = status.as_str(),
                    "memory transitioned"
                );
                return Ok(());
            }
            tracing::warn!(target: "engram_lifecycle", memory_id = %memory.memory_id, attempt, "optimistic update lost, retrying");
            memory = self.require_memory(&memory.memory_id.clone()).await?;
        }
        Err(EngramError::Storage(
            engram_core::errors::StorageError::OptimisticLockLost {
                memory_id: memory.memory_id,
            },
        ))
    }

    async fn record(
        &self,
        conflict: &MemoryConflict,
        strategy: ResolutionStrategy,
        outcome: ResolutionOutcome,
    ) -> EngramResult<MemoryConflict> {
        let mut resolved = conflict.clone();
        resolved.resolution_strategy = Some(strategy);
        resolved.resolution_outcome = Some(outcome);
        resolved.resolved_at = Some(Utc::now());
        self.store.update_conflict(&resolved).await?;
        Ok(resolved)
    }
}

fn data_str(conflict: &MemoryConflict, key: &str) -> EngramResult<String> {
    conflict
        .conflict_data
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            EngramError::Lifecycle(LifecycleError::MalformedConflict {
                conflict_id: conflict.conflict_id.clone(),
                detail: format!("missing {key}"),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinforcement_ratio_picks_strategy() {
        // Heavily reinforced on one side → trust_reinforced.
        assert_eq!(
            select_memory_strategy(5, 1),
            ResolutionStrategy::TrustReinforced
        );
        assert_eq!(
            select_memory_strategy(1, 5),
            ResolutionStrategy::TrustReinforced
        );
        // A single prior sighting vs a fresh observation → trust_recent.
        assert_eq!(select_memory_strategy(1, 0), ResolutionStrategy::TrustRecent);
        assert_eq!(select_memory_strategy(0, 0), ResolutionStrategy::TrustRecent);
        assert_eq!(select_memory_strategy(3, 2), ResolutionStrategy::TrustRecent);
    }
}
