//! Storage-side seeding helpers.

use engram_core::domain::default_relations;
use engram_core::traits::MemoryStore;
use engram_core::EngramResult;
use engram_storage::StorageEngine;

/// Fixture embedding dimension; small on purpose.
pub const FIXTURE_DIMENSIONS: usize = 64;

/// A fresh in-memory storage engine at the fixture dimension.
pub fn fixture_engine() -> StorageEngine {
    StorageEngine::open_in_memory(FIXTURE_DIMENSIONS).expect("open in-memory engine")
}

/// Install the default six-table ontology.
pub async fn seed_ontology(engine: &StorageEngine) -> EngramResult<()> {
    engine.replace_ontology(&default_relations()).await
}
