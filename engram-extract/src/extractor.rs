//! The extraction engine: prompt → triples → normalize → render → embed →
//! conflict probe → persist → reinforce.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use engram_core::clamp_confidence;
use engram_core::config::HeuristicRegistry;
use engram_core::models::{
    CanonicalEntity, ChatEvent, ConfidenceFactors, ExtractedTriple, MemoryConflict,
    MemoryStatus, SemanticMemory,
};
use engram_core::traits::{DomainDb, Embedder, LanguageModel, MemoryStore};
use engram_core::EngramResult;

use engram_lifecycle::reinforcement;

use crate::conflict;
use crate::normalize::{normalize_value, values_equivalent};
use crate::prompt;
use crate::render;

const EXTRACTION_MAX_TOKENS: u32 = 1024;

/// A resolved mention handed to the extractor: the entity plus the
/// resolution confidence that feeds `confidence_factors`.
#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub entity: CanonicalEntity,
    pub confidence: f64,
}

/// What one extraction pass produced.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    /// Triples the model proposed (post-parse, pre-persistence).
    pub triples: Vec<ExtractedTriple>,
    /// Semantic memories actually created this pass.
    pub created: Vec<SemanticMemory>,
    /// Memories reinforced instead of duplicated.
    pub reinforced: Vec<String>,
    /// Conflicts detected and recorded.
    pub conflicts: Vec<MemoryConflict>,
}

pub struct SemanticExtractor {
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn MemoryStore>,
    domain: Arc<dyn DomainDb>,
    registry: Arc<HeuristicRegistry>,
    llm_timeout: Duration,
}

impl SemanticExtractor {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn MemoryStore>,
        domain: Arc<dyn DomainDb>,
        registry: Arc<HeuristicRegistry>,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            embedder,
            store,
            domain,
            registry,
            llm_timeout,
        }
    }

    /// Extract and persist triples from one (already redacted) message.
    ///
    /// LLM failure or malformed JSON yields an empty outcome; only storage
    /// errors propagate.
    pub async fn extract(
        &self,
        event: &ChatEvent,
        resolved: &[ResolvedEntity],
    ) -> EngramResult<ExtractionOutcome> {
        let mut outcome = ExtractionOutcome::default();
        if resolved.is_empty() {
            return Ok(outcome);
        }

        let entity_refs: Vec<&CanonicalEntity> = resolved.iter().map(|r| &r.entity).collect();
        let prompt_text = prompt::build_prompt(&event.content, &entity_refs);

        let response = match self
            .llm
            .complete(&prompt_text, EXTRACTION_MAX_TOKENS, self.llm_timeout)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(target: "engram_extract", error = %e, "extraction llm failed, zero triples");
                return Ok(outcome);
            }
        };

        let Some(triples) = prompt::parse_triples(&response) else {
            tracing::warn!(target: "engram_extract", "extraction response malformed, zero triples");
            return Ok(outcome);
        };

        let by_id: HashMap<&str, &ResolvedEntity> = resolved
            .iter()
            .map(|r| (r.entity.entity_id.as_str(), r))
            .collect();
        let related: Vec<String> = resolved
            .iter()
            .map(|r| r.entity.entity_id.clone())
            .collect();

        for triple in &triples {
            let Some(subject) = by_id.get(triple.subject_entity_id.as_str()) else {
                tracing::warn!(
                    target: "engram_extract",
                    subject = %triple.subject_entity_id,
                    "triple references unresolved subject, skipped"
                );
                continue;
            };
            match self
                .persist_triple(event, subject, triple, &related, &mut outcome)
                .await
            {
                Ok(()) => {}
                Err(e) => return Err(e),
            }
        }

        outcome.triples = triples;
        Ok(outcome)
    }

    async fn persist_triple(
        &self,
        event: &ChatEvent,
        subject: &ResolvedEntity,
        triple: &ExtractedTriple,
        related: &[String],
        outcome: &mut ExtractionOutcome,
    ) -> EngramResult<()> {
        let h = self.registry.snapshot();
        let object_value = normalize_value(&triple.object_value);

        let original_text = if triple.original_text.trim().is_empty() {
            render::render_triple(&subject.entity.canonical_name, &triple.predicate, &object_value)
        } else {
            triple.original_text.trim().to_string()
        };

        // Embedding failure is fatal for this memory only.
        let embedding = match self.embedder.embed(&original_text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "engram_extract", error = %e, text = %original_text, "embedding failed, triple dropped");
                return Ok(());
            }
        };

        let existing = self
            .store
            .semantic_by_subject_predicate(
                &subject.entity.entity_id,
                &triple.predicate,
                &event.user_id,
            )
            .await?;

        // Equivalent re-observation reinforces instead of duplicating.
        if let Some(equivalent) = existing
            .iter()
            .find(|m| values_equivalent(&m.object_value, &object_value))
        {
            match reinforcement::reinforce_stored(&self.store, &equivalent.memory_id, &h.confidence)
                .await
            {
                Ok(Some(_)) => outcome.reinforced.push(equivalent.memory_id.clone()),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target: "engram_extract", error = %e, "reinforcement failed")
                }
            }
            return Ok(());
        }

        let now = Utc::now();
        let memory = SemanticMemory {
            memory_id: uuid::Uuid::new_v4().to_string(),
            user_id: event.user_id.clone(),
            subject_entity_id: subject.entity.entity_id.clone(),
            predicate: triple.predicate.clone(),
            predicate_type: triple.predicate_type,
            object_value: object_value.clone(),
            original_text,
            source_text: event.content.clone(),
            related_entities: related.to_vec(),
            embedding,
            confidence: clamp_confidence(triple.confidence_hint),
            confidence_factors: ConfidenceFactors {
                extractor_hint: triple.confidence_hint,
                subject_resolution: subject.confidence,
                consolidation_boosts: 0,
            },
            reinforcement_count: 0,
            status: MemoryStatus::Active,
            last_validated_at: now,
            extracted_from_event_id: Some(event.event_id.clone()),
            source_memory_id: None,
            superseded_by_memory_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create_semantic(&memory).await?;

        // Memory-vs-memory: same structured key, different value.
        for other in &existing {
            if !values_equivalent(&other.object_value, &object_value) {
                let record = conflict::memory_vs_memory(other, &memory);
                self.store.create_conflict(&record).await?;
                outcome.conflicts.push(record);
            }
        }

        // Memory-vs-db: the authoritative row disagrees.
        if let Some(record) =
            conflict::probe_db(&*self.domain, &subject.entity, &memory).await?
        {
            self.store.create_conflict(&record).await?;
            outcome.conflicts.push(record);
        }

        tracing::debug!(
            target: "engram_extract",
            memory_id = %memory.memory_id,
            subject = %memory.subject_entity_id,
            predicate = %memory.predicate,
            "semantic memory created"
        );
        outcome.created.push(memory);
        Ok(())
    }
}
