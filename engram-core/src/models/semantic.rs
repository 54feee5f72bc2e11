use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed enumeration of triple kinds the extractor may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateType {
    Preference,
    Requirement,
    Observation,
    Policy,
    Attribute,
}

impl PredicateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateType::Preference => "preference",
            PredicateType::Requirement => "requirement",
            PredicateType::Observation => "observation",
            PredicateType::Policy => "policy",
            PredicateType::Attribute => "attribute",
        }
    }

    /// All variants, in prompt order.
    pub const ALL: [PredicateType; 5] = [
        PredicateType::Preference,
        PredicateType::Requirement,
        PredicateType::Observation,
        PredicateType::Policy,
        PredicateType::Attribute,
    ];
}

/// Lifecycle state of a semantic memory.
///
/// Transitions: `active → aging` when effective confidence drops below the
/// low-confidence floor; `active|aging → superseded` on conflict loss;
/// `active|aging → invalidated` on DB conflict or explicit user rejection;
/// validation returns `aging → active`. `superseded` and `invalidated` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    Active,
    Aging,
    Superseded,
    Invalidated,
}

impl MemoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryStatus::Active => "active",
            MemoryStatus::Aging => "aging",
            MemoryStatus::Superseded => "superseded",
            MemoryStatus::Invalidated => "invalidated",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MemoryStatus::Superseded | MemoryStatus::Invalidated)
    }
}

/// Ingredients of the initial confidence assignment, kept for explainability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceFactors {
    /// What the extractor's hint was before clamping.
    pub extractor_hint: f64,
    /// Resolution confidence of the subject entity at extraction time.
    pub subject_resolution: f64,
    /// Boosts applied by consolidation runs.
    pub consolidation_boosts: u32,
}

/// A durable fact about an entity expressed as a subject/predicate/object
/// triple. The central object of the system.
///
/// The embedding is computed over `original_text` (the natural-language
/// rendering), never the raw triple; the structured fields exist for
/// deterministic lookup and conflict detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticMemory {
    pub memory_id: String,
    pub user_id: String,
    pub subject_entity_id: String,
    pub predicate: String,
    pub predicate_type: PredicateType,
    pub object_value: serde_json::Value,
    /// Natural-language form of the triple; the embedded text.
    pub original_text: String,
    /// The (redacted) message content this was extracted from.
    pub source_text: String,
    pub related_entities: Vec<String>,
    pub embedding: Vec<f32>,
    pub confidence: f64,
    pub confidence_factors: ConfidenceFactors,
    pub reinforcement_count: u32,
    pub status: MemoryStatus,
    pub last_validated_at: DateTime<Utc>,
    pub extracted_from_event_id: Option<String>,
    pub source_memory_id: Option<String>,
    pub superseded_by_memory_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SemanticMemory {
    /// Write-time invariant: a superseded memory must point at its winner.
    pub fn supersession_is_consistent(&self) -> bool {
        match self.status {
            MemoryStatus::Superseded => self.superseded_by_memory_id.is_some(),
            _ => true,
        }
    }
}
