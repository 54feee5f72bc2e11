pub mod heuristics;
pub mod llm_config;
pub mod storage_config;

use serde::{Deserialize, Serialize};

pub use heuristics::{
    ConfidenceHeuristics, ConsolidationHeuristics, HeuristicRegistry, Heuristics,
    ResolutionHeuristics, RetrievalHeuristics, StrategyWeights, TaskHeuristics,
    ValidationHeuristics, DEFAULT_STRATEGY,
};
pub use llm_config::LlmConfig;
pub use storage_config::StorageConfig;

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngramConfig {
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub heuristics: Heuristics,
}

impl EngramConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
