use serde::{Deserialize, Serialize};

use super::{ConflictType, DomainFact, ResolutionStrategy};

/// Which layer a retrieved memory came from. Retrieval deduplicates by
/// `(layer, memory_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLayer {
    Episodic,
    Semantic,
    Procedural,
    Summary,
}

impl MemoryLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryLayer::Episodic => "episodic",
            MemoryLayer::Semantic => "semantic",
            MemoryLayer::Procedural => "procedural",
            MemoryLayer::Summary => "summary",
        }
    }
}

/// Per-signal relevance breakdown, each component in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub semantic: f64,
    pub entity: f64,
    pub temporal: f64,
    pub importance: f64,
    pub reinforcement: f64,
}

/// Back-pointers from a shown memory to its origin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    pub memory_id: String,
    pub extracted_from_event_id: Option<String>,
    pub source_memory_id: Option<String>,
}

/// One memory as it appears in the assembled context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedMemory {
    pub memory_id: String,
    pub layer: MemoryLayer,
    pub original_text: String,
    pub effective_confidence: f64,
    pub score: f64,
    pub signal_breakdown: SignalBreakdown,
    pub provenance: Provenance,
}

/// A procedural-memory match that fired against the domain facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveNotice {
    pub trigger_id: String,
    pub notice_text: String,
    pub priority: u8,
}

/// A conflict surfaced to the reply generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedConflict {
    pub conflict_type: ConflictType,
    pub memory_value: serde_json::Value,
    pub db_value: Option<serde_json::Value>,
    pub resolution_strategy: Option<ResolutionStrategy>,
}

/// The structured context handed to the reply generator. The core never
/// returns a citation it cannot walk back to a chat event or a domain row:
/// `provenance` mirrors exactly the set of memories shown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyContext {
    pub query_text: String,
    pub domain_facts: Vec<DomainFact>,
    pub memories: Vec<RetrievedMemory>,
    pub proactive_notices: Vec<ProactiveNotice>,
    pub validation_prompts: Vec<String>,
    pub conflicts_detected: Vec<DetectedConflict>,
    pub provenance: Vec<Provenance>,
}

impl Default for MemoryLayer {
    fn default() -> Self {
        MemoryLayer::Semantic
    }
}
