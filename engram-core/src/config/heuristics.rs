//! The heuristic registry: every tunable threshold, decay rate, and weight in
//! one read-only table. Values change by atomic reload, never by code change.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// The default retrieval strategy name.
pub const DEFAULT_STRATEGY: &str = "factual_entity_focused";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionHeuristics {
    /// Minimum trigram similarity for a fuzzy candidate to count at all.
    pub fuzzy_threshold: f64,
    /// Similarity at which a fuzzy match is accepted without asking.
    pub fuzzy_auto: f64,
    /// Required gap between the top two candidates before auto-accepting.
    pub ambiguity_margin: f64,
}

impl Default for ResolutionHeuristics {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.70,
            fuzzy_auto: 0.85,
            ambiguity_margin: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceHeuristics {
    pub max: f64,
    pub decay_per_day: f64,
    /// Boost for the nth observation past the initial one; the last entry
    /// repeats for all later observations.
    pub reinforcement_schedule: Vec<f64>,
    pub consolidation_boost: f64,
}

impl Default for ConfidenceHeuristics {
    fn default() -> Self {
        Self {
            max: 0.95,
            decay_per_day: 0.01,
            reinforcement_schedule: vec![0.15, 0.10, 0.05, 0.02],
            consolidation_boost: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationHeuristics {
    pub stale_days: i64,
    pub low_confidence: f64,
}

impl Default for ValidationHeuristics {
    fn default() -> Self {
        Self {
            stale_days: 90,
            low_confidence: 0.60,
        }
    }
}

/// A named preset of retrieval weights. The five weights sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyWeights {
    pub semantic: f64,
    pub entity: f64,
    pub recency: f64,
    pub importance: f64,
    pub reinforcement: f64,
    pub recency_halflife_days: f64,
    pub top_k: usize,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            semantic: 0.25,
            entity: 0.40,
            recency: 0.20,
            importance: 0.10,
            reinforcement: 0.05,
            recency_halflife_days: 30.0,
            top_k: 10,
        }
    }
}

impl StrategyWeights {
    pub fn sum(&self) -> f64 {
        self.semantic + self.entity + self.recency + self.importance + self.reinforcement
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalHeuristics {
    pub strategies: BTreeMap<String, StrategyWeights>,
}

impl Default for RetrievalHeuristics {
    fn default() -> Self {
        let mut strategies = BTreeMap::new();
        strategies.insert(DEFAULT_STRATEGY.to_string(), StrategyWeights::default());
        Self { strategies }
    }
}

impl RetrievalHeuristics {
    /// Look up a strategy preset; unknown names fall back to the default
    /// preset so a typo in config degrades rather than fails.
    pub fn strategy(&self, name: &str) -> StrategyWeights {
        if let Some(w) = self.strategies.get(name) {
            return w.clone();
        }
        if name != DEFAULT_STRATEGY {
            tracing::warn!(target: "engram_core", strategy = name, "unknown retrieval strategy, using default");
        }
        self.strategies
            .get(DEFAULT_STRATEGY)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationHeuristics {
    pub episode_threshold: usize,
    pub session_threshold: usize,
}

impl Default for ConsolidationHeuristics {
    fn default() -> Self {
        Self {
            episode_threshold: 10,
            session_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskHeuristics {
    pub sla_days: i64,
}

impl Default for TaskHeuristics {
    fn default() -> Self {
        Self { sla_days: 7 }
    }
}

/// The full heuristic table. One consistent snapshot; see [`HeuristicRegistry`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    pub resolution: ResolutionHeuristics,
    pub confidence: ConfidenceHeuristics,
    pub validation: ValidationHeuristics,
    pub retrieval: RetrievalHeuristics,
    pub consolidation: ConsolidationHeuristics,
    pub tasks: TaskHeuristics,
}

impl Heuristics {
    /// Dotted-key scalar lookup, for ops tooling and explainability surfaces.
    /// Typed access through the struct fields is preferred in code.
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "resolution.fuzzy_threshold" => Some(self.resolution.fuzzy_threshold),
            "resolution.fuzzy_auto" => Some(self.resolution.fuzzy_auto),
            "resolution.ambiguity_margin" => Some(self.resolution.ambiguity_margin),
            "confidence.max" => Some(self.confidence.max),
            "confidence.decay_per_day" => Some(self.confidence.decay_per_day),
            "confidence.consolidation_boost" => Some(self.confidence.consolidation_boost),
            "validation.stale_days" => Some(self.validation.stale_days as f64),
            "validation.low_confidence" => Some(self.validation.low_confidence),
            "consolidation.episode_threshold" => {
                Some(self.consolidation.episode_threshold as f64)
            }
            "consolidation.session_threshold" => {
                Some(self.consolidation.session_threshold as f64)
            }
            "tasks.sla_days" => Some(self.tasks.sla_days as f64),
            _ => None,
        }
    }
}

/// Atomically swappable heuristics snapshot. Readers always see a consistent
/// table; `reload` swaps the whole snapshot in one step.
#[derive(Debug)]
pub struct HeuristicRegistry {
    inner: ArcSwap<Heuristics>,
}

impl HeuristicRegistry {
    pub fn new(heuristics: Heuristics) -> Self {
        Self {
            inner: ArcSwap::from_pointee(heuristics),
        }
    }

    /// A consistent snapshot of the current table.
    pub fn snapshot(&self) -> Arc<Heuristics> {
        self.inner.load_full()
    }

    /// Replace the whole table atomically.
    pub fn reload(&self, heuristics: Heuristics) {
        self.inner.store(Arc::new(heuristics));
        tracing::info!(target: "engram_core", "heuristic registry reloaded");
    }
}

impl Default for HeuristicRegistry {
    fn default() -> Self {
        Self::new(Heuristics::default())
    }
}
