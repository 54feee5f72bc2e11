use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::ChatEvent;

/// Append-only chat event log. `append` is idempotent on `content_hash`:
/// a duplicate returns the previously stored event.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: ChatEvent) -> EngramResult<ChatEvent>;

    async fn get(&self, event_id: &str) -> EngramResult<Option<ChatEvent>>;

    /// Events of one session ordered by `created_at`.
    async fn session_events(
        &self,
        session_id: &str,
        limit: usize,
    ) -> EngramResult<Vec<ChatEvent>>;
}
