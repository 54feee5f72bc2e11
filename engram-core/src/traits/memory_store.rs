use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::{
    EpisodicMemory, MemoryConflict, MemoryStatus, MemorySummary, OntologyRelation,
    ProceduralMemory, SemanticMemory, SummaryScope,
};

/// Structured filter for semantic similarity search.
#[derive(Debug, Clone, Default)]
pub struct SemanticFilter {
    pub user_id: Option<String>,
    pub subject_entity_id: Option<String>,
    /// Empty means active + aging (the retrievable states).
    pub statuses: Vec<MemoryStatus>,
    /// Memories created at or after this instant are excluded. Used by the
    /// turn pipeline so retrieval never reads its own writes.
    pub created_before: Option<chrono::DateTime<chrono::Utc>>,
}

/// Persistence for the memory layers, conflict records, and the ontology
/// table. Vector queries compute cosine similarity over the stored
/// embeddings; deduplication by `(layer, memory_id)` happens downstream.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    // Episodic
    async fn create_episodic(&self, memory: &EpisodicMemory) -> EngramResult<()>;
    async fn get_episodic(&self, memory_id: &str) -> EngramResult<Option<EpisodicMemory>>;
    async fn episodic_by_entities(
        &self,
        entity_ids: &[String],
        user_id: &str,
        limit: usize,
    ) -> EngramResult<Vec<EpisodicMemory>>;
    async fn episodic_similar(
        &self,
        embedding: &[f32],
        limit: usize,
        user_id: &str,
    ) -> EngramResult<Vec<(EpisodicMemory, f64)>>;
    /// Most recent episodes of one session, newest first.
    async fn episodic_by_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> EngramResult<Vec<EpisodicMemory>>;
    async fn update_episodic(&self, memory: &EpisodicMemory) -> EngramResult<()>;

    // Semantic
    async fn create_semantic(&self, memory: &SemanticMemory) -> EngramResult<()>;
    async fn get_semantic(&self, memory_id: &str) -> EngramResult<Option<SemanticMemory>>;
    async fn semantic_by_subject_predicate(
        &self,
        subject_entity_id: &str,
        predicate: &str,
        user_id: &str,
    ) -> EngramResult<Vec<SemanticMemory>>;
    async fn semantic_similar(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: &SemanticFilter,
    ) -> EngramResult<Vec<(SemanticMemory, f64)>>;
    async fn semantic_by_entities(
        &self,
        entity_ids: &[String],
        user_id: &str,
        limit: usize,
    ) -> EngramResult<Vec<SemanticMemory>>;
    /// Active memories with the same subject and predicate, excluding one id.
    async fn find_reinforcements(
        &self,
        subject_entity_id: &str,
        predicate: &str,
        exclude_id: &str,
    ) -> EngramResult<Vec<SemanticMemory>>;
    /// Optimistic update on `(memory_id, updated_at)`. Returns `false` when
    /// the stored row moved on; the caller rereads and retries once.
    async fn update_semantic(&self, memory: &SemanticMemory) -> EngramResult<bool>;

    // Procedural
    async fn create_procedural(&self, memory: &ProceduralMemory) -> EngramResult<()>;
    async fn procedural_similar(
        &self,
        embedding: &[f32],
        limit: usize,
        user_id: &str,
    ) -> EngramResult<Vec<(ProceduralMemory, f64)>>;
    async fn update_procedural(&self, memory: &ProceduralMemory) -> EngramResult<()>;

    // Summaries
    async fn create_summary(&self, summary: &MemorySummary) -> EngramResult<()>;
    async fn summary_by_scope(
        &self,
        scope_type: SummaryScope,
        scope_identifier: &str,
        user_id: &str,
    ) -> EngramResult<Option<MemorySummary>>;
    async fn summary_similar(
        &self,
        embedding: &[f32],
        limit: usize,
        user_id: &str,
    ) -> EngramResult<Vec<(MemorySummary, f64)>>;

    // Conflicts
    async fn create_conflict(&self, conflict: &MemoryConflict) -> EngramResult<()>;
    async fn update_conflict(&self, conflict: &MemoryConflict) -> EngramResult<()>;
    async fn unresolved_conflicts(&self) -> EngramResult<Vec<MemoryConflict>>;

    // Ontology
    async fn ontology_relations(&self) -> EngramResult<Vec<OntologyRelation>>;
    async fn replace_ontology(&self, relations: &[OntologyRelation]) -> EngramResult<()>;
}
