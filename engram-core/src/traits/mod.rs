mod capabilities;
mod entity_store;
mod event_log;
mod memory_store;

pub use capabilities::{DomainDb, DomainRow, Embedder, LanguageModel};
pub use entity_store::EntityStore;
pub use event_log::EventLog;
pub use memory_store::{MemoryStore, SemanticFilter};
