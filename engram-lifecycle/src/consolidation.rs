//! Consolidation: when a scope accumulates enough episodes, synthesize a
//! summary, boost the facts the summary restates, and attenuate the source
//! episodes so they fall below retrieval cutoffs. An LLM failure degrades to
//! a concatenated fallback summary with no confidence boost — the turn never
//! fails because of consolidation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use engram_core::config::HeuristicRegistry;
use engram_core::models::{
    EpisodicMemory, MemorySummary, SemanticMemory, SourceData, SummaryScope,
};
use engram_core::traits::{Embedder, LanguageModel, MemoryStore};
use engram_core::EngramResult;

/// Importance multiplier applied to consolidated episodes.
const EPISODE_ATTENUATION: f64 = 0.5;

const SUMMARY_MAX_TOKENS: u32 = 768;

/// How many fallback episode summaries to concatenate.
const FALLBACK_EPISODES: usize = 5;

pub struct Consolidator {
    store: Arc<dyn MemoryStore>,
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    registry: Arc<HeuristicRegistry>,
    llm_timeout: Duration,
}

/// The shape the summarization LLM is asked to return.
#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: String,
    #[serde(default)]
    key_facts: Vec<KeyFact>,
}

#[derive(Debug, Deserialize)]
struct KeyFact {
    fact: String,
    /// Ids of semantic memories the fact restates, when the model can tell.
    #[serde(default)]
    memory_ids: Vec<String>,
    #[serde(default)]
    confidence: f64,
}

impl Consolidator {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        registry: Arc<HeuristicRegistry>,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            store,
            llm,
            embedder,
            registry,
            llm_timeout,
        }
    }

    /// Consolidate an entity scope if it crossed the episode threshold.
    /// Returns the new summary, or `None` when below threshold.
    pub async fn maybe_consolidate_entity(
        &self,
        user_id: &str,
        entity_id: &str,
    ) -> EngramResult<Option<MemorySummary>> {
        let h = self.registry.snapshot();
        let episodes = self
            .store
            .episodic_by_entities(&[entity_id.to_string()], user_id, 200)
            .await?;
        // Only unconsolidated weight counts toward the trigger.
        let eligible: Vec<EpisodicMemory> = episodes
            .into_iter()
            .filter(|e| e.importance > EPISODE_ATTENUATION)
            .collect();

        let sessions: std::collections::HashSet<&str> =
            eligible.iter().map(|e| e.session_id.as_str()).collect();
        if eligible.len() < h.consolidation.episode_threshold
            && sessions.len() < h.consolidation.session_threshold
        {
            return Ok(None);
        }

        let facts = self
            .store
            .semantic_by_entities(
                &[entity_id.to_string()],
                user_id,
                100,
            )
            .await?;

        self.consolidate(
            user_id,
            SummaryScope::Entity,
            entity_id,
            eligible,
            facts,
        )
        .await
        .map(Some)
    }

    async fn consolidate(
        &self,
        user_id: &str,
        scope_type: SummaryScope,
        scope_identifier: &str,
        episodes: Vec<EpisodicMemory>,
        facts: Vec<SemanticMemory>,
    ) -> EngramResult<MemorySummary> {
        let h = self.registry.snapshot();
        let prompt = build_prompt(scope_identifier, &episodes, &facts);

        let (summary_text, key_facts, boosted_ids) = match self
            .llm
            .complete(&prompt, SUMMARY_MAX_TOKENS, self.llm_timeout)
            .await
        {
            Ok(response) => match parse_response(&response) {
                Some(parsed) => {
                    let known: Vec<String> = facts.iter().map(|f| f.memory_id.clone()).collect();
                    let boosted: Vec<String> = parsed
                        .key_facts
                        .iter()
                        .flat_map(|f| f.memory_ids.iter())
                        .filter(|id| known.contains(id))
                        .cloned()
                        .collect();
                    (
                        parsed.summary,
                        parsed.key_facts.into_iter().map(|f| f.fact).collect(),
                        boosted,
                    )
                }
                None => {
                    tracing::warn!(target: "engram_lifecycle", scope = scope_identifier, "summary response malformed, using fallback");
                    (fallback_summary(&episodes), Vec::new(), Vec::new())
                }
            },
            Err(e) => {
                tracing::warn!(target: "engram_lifecycle", scope = scope_identifier, error = %e, "summary llm failed, using fallback");
                (fallback_summary(&episodes), Vec::new(), Vec::new())
            }
        };

        // Confirmed facts get the consolidation boost; counts stay untouched.
        for memory_id in &boosted_ids {
            if let Some(mut memory) = self.store.get_semantic(memory_id).await? {
                memory.confidence =
                    (memory.confidence + h.confidence.consolidation_boost).min(h.confidence.max);
                memory.confidence_factors.consolidation_boosts += 1;
                if !self.store.update_semantic(&memory).await? {
                    tracing::warn!(target: "engram_lifecycle", memory_id, "consolidation boost lost optimistic race");
                }
            }
        }

        // Source episodes stay, attenuated below retrieval cutoffs.
        for episode in &episodes {
            let mut attenuated = episode.clone();
            attenuated.importance *= EPISODE_ATTENUATION;
            self.store.update_episodic(&attenuated).await?;
        }

        let embedding = match self.embedder.embed(&summary_text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "engram_lifecycle", error = %e, "summary embedding failed, storing zero vector");
                vec![0.0; self.embedder.dimensions()]
            }
        };

        let now = Utc::now();
        let summary = MemorySummary {
            summary_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            scope_type,
            scope_identifier: scope_identifier.to_string(),
            summary_text,
            key_facts,
            source_data: SourceData {
                episodic_ids: episodes.iter().map(|e| e.memory_id.clone()).collect(),
                semantic_ids: facts.iter().map(|f| f.memory_id.clone()).collect(),
            },
            embedding,
            created_at: now,
            updated_at: now,
        };
        self.store.create_summary(&summary).await?;
        tracing::info!(
            target: "engram_lifecycle",
            scope = scope_identifier,
            episodes = summary.source_data.episodic_ids.len(),
            boosted = boosted_ids.len(),
            "consolidated scope"
        );
        Ok(summary)
    }

}

fn build_prompt(
    scope_identifier: &str,
    episodes: &[EpisodicMemory],
    facts: &[SemanticMemory],
) -> String {
    let mut prompt = format!(
        "Consolidate what is known about {scope_identifier} from the episodes \
         and facts below into a short prose summary plus key facts.\n\nEpisodes:\n"
    );
    for e in episodes {
        prompt.push_str(&format!("- [{}] {}\n", e.memory_id, e.summary));
    }
    prompt.push_str("\nKnown facts:\n");
    for f in facts {
        prompt.push_str(&format!("- [{}] {}\n", f.memory_id, f.original_text));
    }
    prompt.push_str(
        "\nRespond with JSON only:\n\
         {\"summary\": \"...\", \"key_facts\": [{\"fact\": \"...\", \
         \"memory_ids\": [\"id of any known fact this restates\"], \
         \"confidence\": 0.0}]}\n",
    );
    prompt
}

fn parse_response(response: &str) -> Option<SummaryResponse> {
    let trimmed = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(trimmed).ok()
}

/// Concatenation of the most recent episode summaries; no boost attached.
fn fallback_summary(episodes: &[EpisodicMemory]) -> String {
    episodes
        .iter()
        .rev()
        .take(FALLBACK_EPISODES)
        .map(|e| e.summary.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
