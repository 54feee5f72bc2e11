//! The five-stage resolution pipeline. First confident stage wins.

use std::sync::Arc;

use engram_core::config::HeuristicRegistry;
use engram_core::errors::ResolutionError;
use engram_core::models::{
    AliasSource, EntityCandidate, ResolutionContext, ResolutionMethod, ResolutionResult,
};
use engram_core::traits::{DomainDb, EntityStore, LanguageModel};
use engram_core::{EngramError, EngramResult};

use crate::coreference::{self, COREFERENCE_CONFIDENCE};
use crate::domain_probe::{self, DOMAIN_DB_CONFIDENCE};
use crate::mention::is_referential;

pub struct EntityResolver {
    entities: Arc<dyn EntityStore>,
    llm: Arc<dyn LanguageModel>,
    domain: Arc<dyn DomainDb>,
    registry: Arc<HeuristicRegistry>,
}

impl EntityResolver {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        llm: Arc<dyn LanguageModel>,
        domain: Arc<dyn DomainDb>,
        registry: Arc<HeuristicRegistry>,
    ) -> Self {
        Self {
            entities,
            llm,
            domain,
            registry,
        }
    }

    /// Resolve a mention to a canonical entity id.
    ///
    /// Stages 1-3 are deterministic. A pronoun or definite NP goes straight
    /// to coreference; a mention already learned as an alias never reaches
    /// the LLM.
    pub async fn resolve(
        &self,
        mention: &str,
        ctx: &ResolutionContext,
    ) -> EngramResult<ResolutionResult> {
        if is_referential(mention) {
            if let Some(result) = self.stage_coreference(mention, ctx).await {
                return Ok(result);
            }
            return Err(EngramError::Resolution(ResolutionError::EntityNotFound {
                mention: mention.to_string(),
            }));
        }

        // Stage 1: exact canonical name.
        if let Some(entity) = self.entities.find_exact(mention).await? {
            tracing::debug!(target: "engram_resolve", mention, entity = %entity.entity_id, "exact match");
            return Ok(ResolutionResult {
                entity_id: entity.entity_id,
                confidence: 1.0,
                method: ResolutionMethod::Exact,
                metadata: serde_json::json!({}),
            });
        }

        // Stage 2: alias (user-scoped, then global).
        if let Some((alias, entity)) = self
            .entities
            .find_by_alias(mention, Some(&ctx.user_id))
            .await?
        {
            tracing::debug!(target: "engram_resolve", mention, entity = %entity.entity_id, "alias match");
            return Ok(ResolutionResult {
                entity_id: entity.entity_id,
                confidence: alias.confidence,
                method: ResolutionMethod::Alias,
                metadata: serde_json::json!({ "alias_source": alias.source.as_str() }),
            });
        }

        // Stage 3: fuzzy.
        match self.stage_fuzzy(mention, ctx).await? {
            FuzzyOutcome::Resolved(result) => return Ok(result),
            FuzzyOutcome::Ambiguous(candidates) => {
                return Err(EngramError::Resolution(ResolutionError::AmbiguousEntity {
                    mention: mention.to_string(),
                    candidates,
                }));
            }
            FuzzyOutcome::Miss => {}
        }

        // Stage 4: coreference, only with recent context to offer.
        if !ctx.recent_entities.is_empty() {
            if let Some(result) = self.stage_coreference(mention, ctx).await {
                return Ok(result);
            }
        }

        // Stage 5: domain-DB probe. Zero LLM calls.
        if let Some(entity) =
            domain_probe::probe(&*self.entities, &*self.domain, mention, &ctx.user_id).await?
        {
            tracing::debug!(target: "engram_resolve", mention, entity = %entity.entity_id, "domain db hit");
            return Ok(ResolutionResult {
                entity_id: entity.entity_id,
                confidence: DOMAIN_DB_CONFIDENCE,
                method: ResolutionMethod::DomainDb,
                metadata: serde_json::json!({
                    "table": entity.external_ref.as_ref().map(|r| r.table.clone()),
                }),
            });
        }

        Err(EngramError::Resolution(ResolutionError::EntityNotFound {
            mention: mention.to_string(),
        }))
    }

    async fn stage_fuzzy(
        &self,
        mention: &str,
        ctx: &ResolutionContext,
    ) -> EngramResult<FuzzyOutcome> {
        let h = self.registry.snapshot();
        let matches = self
            .entities
            .fuzzy_search(mention, h.resolution.fuzzy_threshold, 5)
            .await?;

        let Some((top_entity, top_sim)) = matches.first().cloned() else {
            return Ok(FuzzyOutcome::Miss);
        };
        let runner_up = matches.get(1).map(|(_, s)| *s).unwrap_or(0.0);

        let auto = top_sim >= h.resolution.fuzzy_auto;
        let clear_margin = (top_sim - runner_up) >= h.resolution.ambiguity_margin;

        if auto && clear_margin {
            // Side effect: learn a user-scoped alias so the next identical
            // mention resolves at stage 2 without recomputing similarity.
            let learned = self
                .entities
                .create_alias(
                    &top_entity.entity_id,
                    mention,
                    AliasSource::FuzzyLearned,
                    Some(&ctx.user_id),
                    top_sim,
                    serde_json::json!({ "similarity": top_sim }),
                )
                .await;
            if let Err(e) = learned {
                tracing::warn!(target: "engram_resolve", mention, error = %e, "alias learning rejected");
            }
            tracing::debug!(target: "engram_resolve", mention, entity = %top_entity.entity_id, similarity = top_sim, "fuzzy match accepted");
            return Ok(FuzzyOutcome::Resolved(ResolutionResult {
                entity_id: top_entity.entity_id,
                confidence: top_sim,
                method: ResolutionMethod::Fuzzy,
                metadata: serde_json::json!({
                    "similarity": top_sim,
                    "runner_up": runner_up,
                }),
            }));
        }

        // Confident enough to be a candidate pool but not to decide.
        let tied: Vec<EntityCandidate> = matches
            .iter()
            .filter(|(_, sim)| {
                if auto {
                    // Only the contenders within the margin of the top.
                    top_sim - sim < h.resolution.ambiguity_margin
                } else {
                    true
                }
            })
            .map(|(entity, sim)| EntityCandidate {
                entity_id: entity.entity_id.clone(),
                canonical_name: entity.canonical_name.clone(),
                similarity: *sim,
            })
            .collect();

        Ok(FuzzyOutcome::Ambiguous(tied))
    }

    async fn stage_coreference(
        &self,
        mention: &str,
        ctx: &ResolutionContext,
    ) -> Option<ResolutionResult> {
        let entity_id = coreference::resolve(
            &*self.llm,
            mention,
            &ctx.recent_entities,
            &ctx.conversation_text,
        )
        .await?;
        tracing::debug!(target: "engram_resolve", mention, entity = %entity_id, "coreference hit");
        Some(ResolutionResult {
            entity_id,
            confidence: COREFERENCE_CONFIDENCE,
            method: ResolutionMethod::Coreference,
            metadata: serde_json::json!({ "candidates": ctx.recent_entities.len() }),
        })
    }
}

enum FuzzyOutcome {
    Resolved(ResolutionResult),
    Ambiguous(Vec<EntityCandidate>),
    Miss,
}
