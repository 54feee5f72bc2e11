//! # engram-lifecycle
//!
//! Confidence arithmetic and state transitions over semantic memories:
//! passive decay (computed on read, never stored), reinforcement with
//! diminishing returns, conflict resolution with auto-selected strategies,
//! consolidation into summaries, and active validation.

pub mod conflicts;
pub mod consolidation;
pub mod decay;
pub mod reinforcement;
pub mod validation;

pub use conflicts::ConflictResolver;
pub use consolidation::Consolidator;
