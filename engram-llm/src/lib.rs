//! # engram-llm
//!
//! The two narrow model capabilities behind HTTP: `complete` against an
//! OpenAI-compatible chat endpoint and `embed` against its embeddings
//! endpoint, both with bounded budgets. An L1 cache keyed by content hash
//! sits in front of the embedder so repeated natural-language texts embed
//! once.

pub mod completion;
pub mod embedding;

pub use completion::HttpCompletionClient;
pub use embedding::{CachedEmbedder, HttpEmbeddingClient};
