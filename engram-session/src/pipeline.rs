//! The session pipeline. Holds every component and runs one turn at a time;
//! turns are self-contained modulo the shared stores, so instances scale
//! horizontally.

use std::sync::Arc;

use chrono::Utc;

use engram_core::config::HeuristicRegistry;
use engram_core::errors::ResolutionError;
use engram_core::models::{
    ChatEvent, ChatRole, ConfidenceFactors, DetectedConflict, EpisodicMemory,
    MemoryConflict, MemoryStatus, PredicateType, ReplyContext, SemanticMemory,
};
use engram_core::traits::{
    DomainDb, Embedder, EntityStore, EventLog, LanguageModel, MemoryStore,
};
use engram_core::{EngramError, EngramResult};

use engram_extract::{ResolvedEntity, SemanticExtractor};
use engram_lifecycle::{validation, ConflictResolver, Consolidator};
use engram_privacy::Redactor;
use engram_resolve::EntityResolver;
use engram_retrieval::{RetrievalQuery, Retriever};

use crate::turn::{TurnOutcome, TurnRequest};

/// Default importance assigned to a turn's episodic memory.
const EPISODE_IMPORTANCE: f64 = 0.6;

/// How many recent session episodes feed the coreference context.
const RECENT_EPISODES: usize = 5;

pub struct SessionPipeline {
    events: Arc<dyn EventLog>,
    entities: Arc<dyn EntityStore>,
    memories: Arc<dyn MemoryStore>,
    embedder: Arc<dyn Embedder>,
    resolver: EntityResolver,
    extractor: SemanticExtractor,
    retriever: Retriever,
    conflicts: ConflictResolver,
    consolidator: Consolidator,
    redactor: Redactor,
    registry: Arc<HeuristicRegistry>,
}

impl SessionPipeline {
    /// Wire the pipeline from the shared stores and the two model
    /// capabilities.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: Arc<dyn EventLog>,
        entities: Arc<dyn EntityStore>,
        memories: Arc<dyn MemoryStore>,
        domain: Arc<dyn DomainDb>,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        registry: Arc<HeuristicRegistry>,
        llm_config: &engram_core::config::LlmConfig,
    ) -> Self {
        let resolver = EntityResolver::new(
            entities.clone(),
            llm.clone(),
            domain.clone(),
            registry.clone(),
        );
        let extractor = SemanticExtractor::new(
            llm.clone(),
            embedder.clone(),
            memories.clone(),
            domain.clone(),
            registry.clone(),
            std::time::Duration::from_secs(llm_config.extract_timeout_secs),
        );
        let retriever = Retriever::new(
            memories.clone(),
            domain.clone(),
            embedder.clone(),
            registry.clone(),
        );
        let conflicts = ConflictResolver::new(memories.clone(), registry.clone());
        let consolidator = Consolidator::new(
            memories.clone(),
            llm,
            embedder.clone(),
            registry.clone(),
            std::time::Duration::from_secs(llm_config.consolidate_timeout_secs),
        );
        Self {
            events,
            entities,
            memories,
            embedder,
            resolver,
            extractor,
            retriever,
            conflicts,
            consolidator,
            redactor: Redactor::new(),
            registry,
        }
    }

    /// Idempotent ingest: redact, hash, append. A logically identical turn
    /// (same session, content, and logical timestamp — e.g. a client retry)
    /// returns the previously stored event. Pass `None` to stamp now.
    pub async fn ingest(
        &self,
        user_id: &str,
        session_id: &str,
        role: ChatRole,
        content: &str,
        metadata: serde_json::Value,
        created_at: Option<chrono::DateTime<Utc>>,
    ) -> EngramResult<(ChatEvent, Vec<engram_privacy::PiiType>)> {
        let report = self.redactor.redact(content);
        let created_at = created_at.unwrap_or_else(Utc::now);
        let event = ChatEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            role,
            content: report.redacted.clone(),
            content_hash: ChatEvent::compute_content_hash(
                session_id,
                &report.redacted,
                created_at,
            ),
            metadata,
            created_at,
        };
        let stored = self.events.append(event).await?;
        Ok((stored, report.detected))
    }

    /// Run one full turn.
    pub async fn run_turn(&self, request: &TurnRequest) -> EngramResult<TurnOutcome> {
        let turn_start = Utc::now();

        let (event, pii) = self
            .ingest(
                &request.user_id,
                &request.session_id,
                ChatRole::User,
                &request.text,
                request.metadata.clone(),
                None,
            )
            .await?;

        if !pii.is_empty() {
            self.record_pii_policy(&event, &pii).await?;
        }

        // Conversation context for coreference.
        let recent = self
            .memories
            .episodic_by_session(&request.session_id, RECENT_EPISODES)
            .await?;
        let mut recent_entities: Vec<String> = Vec::new();
        for episode in &recent {
            for id in &episode.entities {
                if !recent_entities.contains(id) {
                    recent_entities.push(id.clone());
                }
            }
        }
        let conversation_text: String = {
            let events = self
                .events
                .session_events(&request.session_id, RECENT_EPISODES)
                .await?;
            events
                .iter()
                .map(|e| format!("{}: {}", e.role.as_str(), e.content))
                .collect::<Vec<_>>()
                .join("\n")
        };

        // Resolve mentions. Ambiguity halts the turn; an unknown mention is
        // simply not associated with downstream memory.
        let ctx = engram_core::models::ResolutionContext {
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
            recent_entities,
            conversation_text,
        };
        let mut resolved: Vec<ResolvedEntity> = Vec::new();
        for mention in &request.mentions {
            match self.resolver.resolve(mention, &ctx).await {
                Ok(result) => {
                    if let Some(entity) = self.entities.get_by_id(&result.entity_id).await? {
                        resolved.push(ResolvedEntity {
                            entity,
                            confidence: result.confidence,
                        });
                    }
                }
                Err(EngramError::Resolution(ResolutionError::AmbiguousEntity {
                    mention,
                    candidates,
                })) => {
                    return Ok(TurnOutcome::NeedsDisambiguation {
                        event,
                        mention,
                        candidates,
                    });
                }
                Err(EngramError::Resolution(ResolutionError::EntityNotFound { mention })) => {
                    tracing::debug!(target: "engram_session", mention, "mention unresolved, turn continues");
                }
                Err(other) => return Err(other),
            }
        }
        let resolved_entities: Vec<engram_core::models::CanonicalEntity> =
            resolved.iter().map(|r| r.entity.clone()).collect();

        // Extraction (writes) and retrieval (reads, excluding this turn's
        // writes) run concurrently.
        let query = RetrievalQuery {
            text: request.text.clone(),
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
            strategy: request.strategy.clone(),
            exclude_created_after: Some(turn_start),
        };
        let (extraction, retrieval) = tokio::join!(
            self.extractor.extract(&event, &resolved),
            self.retriever.build(&query, &resolved_entities),
        );
        let extraction = extraction?;
        let retrieval = retrieval?;

        // Retrieval-time DB probe over what we are about to show.
        let mut all_conflicts: Vec<MemoryConflict> = extraction.conflicts.clone();
        for conflict in engram_extract::conflict::detect_against_facts(
            &retrieval.domain_facts,
            &retrieval.semantic_raw,
        ) {
            self.memories.create_conflict(&conflict).await?;
            all_conflicts.push(conflict);
        }

        // Conflict-resolution writes happen before the reply is finalized.
        let mut conflicts_detected = Vec::new();
        for conflict in &all_conflicts {
            match self.conflicts.resolve(conflict).await {
                Ok(resolved_conflict) => {
                    conflicts_detected.push(to_detected(&resolved_conflict));
                }
                Err(e) => {
                    tracing::warn!(target: "engram_session", conflict_id = %conflict.conflict_id, error = %e, "conflict resolution failed");
                    conflicts_detected.push(to_detected(conflict));
                }
            }
        }

        // Aging pass over what retrieval surfaced.
        let h = self.registry.snapshot();
        for memory in &retrieval.semantic_raw {
            if memory.status == MemoryStatus::Active {
                let _ = validation::age_if_needed(
                    &self.memories,
                    memory.clone(),
                    &h,
                    Utc::now(),
                )
                .await;
            }
        }

        // Remember the turn itself.
        self.record_episode(&event, &resolved_entities).await?;

        // Consolidation check per resolved entity; never fails the turn.
        for entity in &resolved_entities {
            if let Err(e) = self
                .consolidator
                .maybe_consolidate_entity(&request.user_id, &entity.entity_id)
                .await
            {
                tracing::warn!(target: "engram_session", entity = %entity.entity_id, error = %e, "consolidation failed");
            }
        }

        let context = ReplyContext {
            query_text: request.text.clone(),
            domain_facts: retrieval.domain_facts,
            memories: retrieval.memories,
            proactive_notices: retrieval.proactive_notices,
            validation_prompts: retrieval.validation_prompts,
            conflicts_detected,
            provenance: retrieval.provenance,
        };

        Ok(TurnOutcome::Completed { event, context })
    }

    /// The turn's episodic memory. Embedding failure drops the episode, not
    /// the turn.
    async fn record_episode(
        &self,
        event: &ChatEvent,
        resolved: &[engram_core::models::CanonicalEntity],
    ) -> EngramResult<()> {
        let names: Vec<&str> = resolved
            .iter()
            .map(|e| e.canonical_name.as_str())
            .collect();
        let summary = if names.is_empty() {
            format!("User said: {}", event.content)
        } else {
            format!("User discussed {}: {}", names.join(", "), event.content)
        };
        let embedding = match self.embedder.embed(&summary).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "engram_session", error = %e, "episode embedding failed, episode dropped");
                return Ok(());
            }
        };
        let now = Utc::now();
        let episode = EpisodicMemory {
            memory_id: uuid::Uuid::new_v4().to_string(),
            user_id: event.user_id.clone(),
            session_id: event.session_id.clone(),
            summary,
            entities: resolved.iter().map(|e| e.entity_id.clone()).collect(),
            embedding,
            importance: EPISODE_IMPORTANCE,
            source_event_id: event.event_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.memories.create_episodic(&episode).await
    }

    /// Policy memory noting that redaction occurred on this event.
    async fn record_pii_policy(
        &self,
        event: &ChatEvent,
        detected: &[engram_privacy::PiiType],
    ) -> EngramResult<()> {
        let types: Vec<String> = detected
            .iter()
            .map(|t| format!("{t:?}").to_lowercase())
            .collect();
        let original_text = "Personally identifiable information was redacted \
                             from this conversation"
            .to_string();
        let embedding = match self.embedder.embed(&original_text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "engram_session", error = %e, "policy embedding failed, policy memory dropped");
                return Ok(());
            }
        };
        let now = Utc::now();
        let memory = SemanticMemory {
            memory_id: uuid::Uuid::new_v4().to_string(),
            user_id: event.user_id.clone(),
            subject_entity_id: format!("user:{}", event.user_id),
            predicate: "pii_redaction".to_string(),
            predicate_type: PredicateType::Policy,
            object_value: serde_json::json!({ "types": types }),
            original_text,
            source_text: event.content.clone(),
            related_entities: Vec::new(),
            embedding,
            confidence: engram_core::MAX_CONFIDENCE,
            confidence_factors: ConfidenceFactors::default(),
            reinforcement_count: 0,
            status: MemoryStatus::Active,
            last_validated_at: now,
            extracted_from_event_id: Some(event.event_id.clone()),
            source_memory_id: None,
            superseded_by_memory_id: None,
            created_at: now,
            updated_at: now,
        };
        self.memories.create_semantic(&memory).await
    }

    /// User validation endpoints.
    pub async fn confirm_memory(&self, memory_id: &str) -> EngramResult<Option<SemanticMemory>> {
        validation::confirm_memory(&self.memories, memory_id).await
    }

    pub async fn reject_memory(&self, memory_id: &str) -> EngramResult<Option<SemanticMemory>> {
        validation::reject_memory(&self.memories, memory_id).await
    }

    /// A suggested SQL patch for completing a task. Never executed here —
    /// the domain DB is read-only from the core's perspective.
    pub fn suggest_task_completion(&self, task_id: &str) -> String {
        format!(
            "UPDATE tasks SET status = 'done' WHERE task_id = '{}';",
            task_id.replace('\'', "''")
        )
    }

    pub(crate) fn memories(&self) -> &Arc<dyn MemoryStore> {
        &self.memories
    }

    pub(crate) fn events(&self) -> &Arc<dyn EventLog> {
        &self.events
    }
}

fn to_detected(conflict: &MemoryConflict) -> DetectedConflict {
    DetectedConflict {
        conflict_type: conflict.conflict_type,
        memory_value: conflict
            .conflict_data
            .get("memory_value")
            .or_else(|| conflict.conflict_data.get("existing_value"))
            .cloned()
            .unwrap_or(serde_json::Value::Null),
        db_value: conflict.conflict_data.get("db_value").cloned(),
        resolution_strategy: conflict.resolution_strategy,
    }
}
