//! Shared test fixtures: an in-memory domain DB seeded with the six tables,
//! a scripted LLM, and a deterministic token-hash embedder.

mod domain_db;
mod embedder;
mod llm;
mod seed;

pub use domain_db::FixtureDomainDb;
pub use embedder::HashEmbedder;
pub use llm::ScriptedLlm;
pub use seed::{fixture_engine, seed_ontology, FIXTURE_DIMENSIONS};
