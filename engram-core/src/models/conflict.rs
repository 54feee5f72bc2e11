use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of disagreement was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    MemoryVsMemory,
    MemoryVsDb,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::MemoryVsMemory => "memory_vs_memory",
            ConflictType::MemoryVsDb => "memory_vs_db",
        }
    }
}

/// How a conflict was (or will be) resolved. Exactly one strategy is ever
/// recorded per conflict; `AskUser` is reserved and never auto-selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    TrustDb,
    TrustRecent,
    TrustReinforced,
    AskUser,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::TrustDb => "trust_db",
            ResolutionStrategy::TrustRecent => "trust_recent",
            ResolutionStrategy::TrustReinforced => "trust_reinforced",
            ResolutionStrategy::AskUser => "ask_user",
        }
    }
}

/// Outcome of a resolved conflict, recorded on the conflict row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub winner_id: String,
    pub loser_id: String,
    pub rationale: String,
}

/// A detected disagreement between two memories, or between a memory and the
/// authoritative domain DB. Never silently resolved: detection appends a row,
/// resolution updates it at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConflict {
    pub conflict_id: String,
    pub conflict_type: ConflictType,
    /// Both sides of the disagreement, structured for the reply generator.
    pub conflict_data: serde_json::Value,
    pub resolution_strategy: Option<ResolutionStrategy>,
    pub resolution_outcome: Option<ResolutionOutcome>,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl MemoryConflict {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}
