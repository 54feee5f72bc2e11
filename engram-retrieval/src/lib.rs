//! # engram-retrieval
//!
//! Reply-time context assembly: candidate generation across the memory
//! layers in parallel, five-signal relevance scoring, ontology-guided
//! domain augmentation, proactive notices, and validation prompts.

pub mod augment;
pub mod candidates;
pub mod classify;
pub mod notices;
pub mod ontology;
pub mod retriever;
pub mod scoring;

pub use retriever::{RetrievalQuery, RetrievedBundle, Retriever};
