//! The retrieval orchestrator: embed once, fan out candidate generation and
//! domain augmentation, score, evaluate notices, collect validation prompts.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use engram_core::config::HeuristicRegistry;
use engram_core::models::{
    CanonicalEntity, DomainFact, ProactiveNotice, Provenance, RetrievedMemory,
    SemanticMemory,
};
use engram_core::traits::{DomainDb, Embedder, MemoryStore};
use engram_core::EngramResult;

use engram_lifecycle::validation;

use crate::augment;
use crate::candidates;
use crate::notices;
use crate::ontology::OntologyGraph;
use crate::scoring;

#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    pub text: String,
    pub user_id: String,
    pub session_id: String,
    /// Named weight preset; unknown names fall back to the default.
    pub strategy: String,
    /// Memories created at or after this instant are invisible — the turn
    /// never reads its own writes.
    pub exclude_created_after: Option<DateTime<Utc>>,
}

/// Everything retrieval produced for the turn. The session pipeline merges
/// in conflicts and assembles the final `ReplyContext`.
#[derive(Debug, Default)]
pub struct RetrievedBundle {
    pub domain_facts: Vec<DomainFact>,
    pub memories: Vec<RetrievedMemory>,
    pub proactive_notices: Vec<ProactiveNotice>,
    pub validation_prompts: Vec<String>,
    pub provenance: Vec<Provenance>,
    /// Raw semantic rows behind the scored memories, for the DB-conflict
    /// probe and the aging pass on the write side.
    pub semantic_raw: Vec<SemanticMemory>,
}

pub struct Retriever {
    store: Arc<dyn MemoryStore>,
    domain: Arc<dyn DomainDb>,
    embedder: Arc<dyn Embedder>,
    registry: Arc<HeuristicRegistry>,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        domain: Arc<dyn DomainDb>,
        embedder: Arc<dyn Embedder>,
        registry: Arc<HeuristicRegistry>,
    ) -> Self {
        Self {
            store,
            domain,
            embedder,
            registry,
        }
    }

    pub async fn build(
        &self,
        query: &RetrievalQuery,
        resolved: &[CanonicalEntity],
    ) -> EngramResult<RetrievedBundle> {
        let h = self.registry.snapshot();
        let weights = h.retrieval.strategy(&query.strategy);
        let now = Utc::now();

        // Embed the query text once. Failure degrades to entity-driven
        // retrieval; the turn continues.
        let query_embedding = match self.embedder.embed(&query.text).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(target: "engram_retrieval", error = %e, "query embedding failed, vector probes skipped");
                None
            }
        };

        let query_entities: Vec<String> =
            resolved.iter().map(|e| e.entity_id.clone()).collect();

        let relations = self.store.ontology_relations().await?;
        let graph = OntologyGraph::new(&relations);

        // Candidate generation and domain augmentation are independent.
        let (candidates, facts) = tokio::join!(
            candidates::generate(
                &self.store,
                query_embedding.as_deref(),
                &query_entities,
                &query.user_id,
                query.exclude_created_after,
                &h,
                now,
            ),
            augment::domain_facts(
                &*self.domain,
                &graph,
                &query.text,
                resolved,
                &h,
                now,
            ),
        );
        let candidates = candidates?;
        let domain_facts = facts?;

        let ranked = scoring::rank(candidates, &query_entities, now, &weights);

        // Keep the raw semantic rows behind the survivors for the caller's
        // write-side passes.
        let mut semantic_raw = Vec::new();
        let mut validation_prompts = Vec::new();
        for (candidate, _, _) in &ranked {
            if candidate.layer == engram_core::models::MemoryLayer::Semantic {
                if let Some(memory) = self.store.get_semantic(&candidate.memory_id).await? {
                    if validation::needs_validation(&memory, &h, now) {
                        validation_prompts.push(validation::validation_prompt(&memory));
                    }
                    semantic_raw.push(memory);
                }
            }
        }

        // Proactive notices from procedural memories near the query.
        let proactive_notices = match &query_embedding {
            Some(embedding) => {
                let procedural = self
                    .store
                    .procedural_similar(embedding, notices::PROCEDURAL_TOP_N, &query.user_id)
                    .await?;
                notices::evaluate(&procedural, &domain_facts, now)
            }
            None => Vec::new(),
        };

        let memories: Vec<RetrievedMemory> = ranked
            .iter()
            .map(|(candidate, score, breakdown)| RetrievedMemory {
                memory_id: candidate.memory_id.clone(),
                layer: candidate.layer,
                original_text: candidate.original_text.clone(),
                effective_confidence: candidate.effective_confidence,
                score: *score,
                signal_breakdown: *breakdown,
                provenance: candidate.provenance.clone(),
            })
            .collect();

        // Provenance mirrors exactly the memories shown — no phantom
        // citations.
        let provenance: Vec<Provenance> =
            memories.iter().map(|m| m.provenance.clone()).collect();

        tracing::debug!(
            target: "engram_retrieval",
            memories = memories.len(),
            facts = domain_facts.len(),
            notices = proactive_notices.len(),
            "retrieval bundle assembled"
        );

        Ok(RetrievedBundle {
            domain_facts,
            memories,
            proactive_notices,
            validation_prompts,
            provenance,
            semantic_raw,
        })
    }
}
