//! # engram-resolve
//!
//! Five-stage hybrid resolution of a textual mention to a canonical entity
//! id. Stages 1-3 (exact, alias, fuzzy) are deterministic and handle the
//! overwhelming majority of mentions; stage 4 (coreference) is the only
//! LLM-touching path; stage 5 probes the domain DB and lazily creates
//! canonical entities for rows it finds.

pub mod coreference;
pub mod domain_probe;
pub mod mention;
pub mod resolver;

pub use resolver::EntityResolver;
