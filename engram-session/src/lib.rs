//! # engram-session
//!
//! The per-turn pipeline over the cooperating components: redact → ingest →
//! resolve → {extract ∥ retrieve} → resolve conflicts → consolidate →
//! remember the turn → assemble the `ReplyContext`. Plus the provenance
//! walk behind `/explain` and the user validation endpoints.

pub mod explain;
pub mod pipeline;
pub mod turn;

pub use pipeline::SessionPipeline;
pub use turn::{TurnOutcome, TurnRequest};
