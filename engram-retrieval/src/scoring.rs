//! Five-signal relevance scoring over a uniform candidate view.
//!
//! Each layer is a tagged variant reduced to the same
//! `{similarity, entities, created_at, importance, reinforcement}` shape, so
//! one scorer covers all of them. Every signal lands in [0, 1] and the
//! combined score is exactly the strategy-weighted dot product.

use chrono::{DateTime, Utc};

use engram_core::config::StrategyWeights;
use engram_core::models::{MemoryLayer, Provenance, SignalBreakdown};

/// The uniform view the scorer sees, regardless of source layer.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub memory_id: String,
    pub layer: MemoryLayer,
    pub original_text: String,
    pub entities: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Episodic importance, semantic effective confidence, or 1.0 for
    /// summaries.
    pub importance: f64,
    pub reinforcement_count: u32,
    /// Cosine similarity to the query embedding, already computed.
    pub similarity: f64,
    /// Effective (decayed) confidence where the layer has one.
    pub effective_confidence: f64,
    pub provenance: Provenance,
}

/// Reinforcement saturates at five observations.
const REINFORCEMENT_SATURATION: f64 = 5.0;

pub fn signals(
    candidate: &Candidate,
    query_entities: &[String],
    now: DateTime<Utc>,
    weights: &StrategyWeights,
) -> SignalBreakdown {
    let semantic = candidate.similarity.clamp(0.0, 1.0);

    let entity = if query_entities.is_empty() {
        0.0
    } else {
        let overlap = query_entities
            .iter()
            .filter(|id| candidate.entities.contains(id))
            .count();
        overlap as f64 / query_entities.len() as f64
    };

    let age_days = ((now - candidate.created_at).num_seconds().max(0) as f64) / 86_400.0;
    let temporal = (-age_days / weights.recency_halflife_days.max(f64::EPSILON)).exp();

    let importance = candidate.importance.clamp(0.0, 1.0);

    let reinforcement =
        (f64::from(candidate.reinforcement_count) / REINFORCEMENT_SATURATION).min(1.0);

    SignalBreakdown {
        semantic,
        entity,
        temporal: temporal.clamp(0.0, 1.0),
        importance,
        reinforcement,
    }
}

/// The strategy-weighted dot product.
pub fn combine(breakdown: &SignalBreakdown, weights: &StrategyWeights) -> f64 {
    breakdown.semantic * weights.semantic
        + breakdown.entity * weights.entity
        + breakdown.temporal * weights.recency
        + breakdown.importance * weights.importance
        + breakdown.reinforcement * weights.reinforcement
}

/// Score and rank candidates. Ties break by reinforcement, then recency.
/// The top `top_k` survive.
pub fn rank(
    candidates: Vec<Candidate>,
    query_entities: &[String],
    now: DateTime<Utc>,
    weights: &StrategyWeights,
) -> Vec<(Candidate, f64, SignalBreakdown)> {
    let mut scored: Vec<(Candidate, f64, SignalBreakdown)> = candidates
        .into_iter()
        .map(|c| {
            let breakdown = signals(&c, query_entities, now, weights);
            let score = combine(&breakdown, weights);
            (c, score, breakdown)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.0.reinforcement_count.cmp(&a.0.reinforcement_count))
            .then_with(|| b.0.created_at.cmp(&a.0.created_at))
    });
    scored.truncate(weights.top_k);
    scored
}
