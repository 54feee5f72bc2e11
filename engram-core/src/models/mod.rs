mod chat_event;
mod conflict;
mod domain_fact;
mod entity;
mod episodic;
mod ontology;
mod procedural;
mod reply_context;
mod resolution;
mod semantic;
mod summary;
mod triple;

pub use chat_event::{ChatEvent, ChatRole};
pub use conflict::{
    ConflictType, MemoryConflict, ResolutionOutcome, ResolutionStrategy,
};
pub use domain_fact::{DomainFact, RiskLevel, TaskRisk};
pub use entity::{AliasSource, CanonicalEntity, EntityAlias, ExternalRef};
pub use episodic::EpisodicMemory;
pub use ontology::{Cardinality, JoinSpec, OntologyRelation};
pub use procedural::{
    ActionStructure, ProceduralMemory, TriggerFeatures, TriggerOp, TriggerPredicate,
};
pub use reply_context::{
    DetectedConflict, MemoryLayer, ProactiveNotice, Provenance, ReplyContext,
    RetrievedMemory, SignalBreakdown,
};
pub use resolution::{EntityCandidate, ResolutionContext, ResolutionMethod, ResolutionResult};
pub use semantic::{ConfidenceFactors, MemoryStatus, PredicateType, SemanticMemory};
pub use summary::{MemorySummary, SourceData, SummaryScope};
pub use triple::ExtractedTriple;
