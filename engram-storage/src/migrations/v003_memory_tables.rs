//! v003: the four memory layers. Each carries a little-endian f32 embedding
//! blob over its natural-language text.

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE episodic_memories (
            memory_id        TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL,
            session_id       TEXT NOT NULL,
            summary          TEXT NOT NULL,
            entities         TEXT NOT NULL DEFAULT '[]',
            embedding        BLOB NOT NULL,
            importance       REAL NOT NULL,
            source_event_id  TEXT NOT NULL REFERENCES chat_events(event_id),
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );
        CREATE INDEX idx_episodic_user ON episodic_memories(user_id, created_at);
        CREATE INDEX idx_episodic_session ON episodic_memories(session_id);

        CREATE TABLE semantic_memories (
            memory_id                TEXT PRIMARY KEY,
            user_id                  TEXT NOT NULL,
            subject_entity_id        TEXT NOT NULL,
            predicate                TEXT NOT NULL,
            predicate_type           TEXT NOT NULL,
            object_value             TEXT NOT NULL,
            original_text            TEXT NOT NULL,
            source_text              TEXT NOT NULL,
            related_entities         TEXT NOT NULL DEFAULT '[]',
            embedding                BLOB NOT NULL,
            confidence               REAL NOT NULL,
            confidence_factors       TEXT NOT NULL DEFAULT '{}',
            reinforcement_count      INTEGER NOT NULL DEFAULT 0,
            status                   TEXT NOT NULL DEFAULT 'active',
            last_validated_at        TEXT NOT NULL,
            extracted_from_event_id  TEXT,
            source_memory_id         TEXT,
            superseded_by_memory_id  TEXT,
            created_at               TEXT NOT NULL,
            updated_at               TEXT NOT NULL
        );
        CREATE INDEX idx_semantic_subject_predicate
            ON semantic_memories(subject_entity_id, predicate);
        CREATE INDEX idx_semantic_user_status ON semantic_memories(user_id, status);

        CREATE TABLE procedural_memories (
            memory_id         TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL,
            trigger_pattern   TEXT NOT NULL,
            trigger_features  TEXT NOT NULL DEFAULT '{}',
            action_heuristic  TEXT NOT NULL,
            action_structure  TEXT NOT NULL DEFAULT '{}',
            embedding         BLOB NOT NULL,
            confidence        REAL NOT NULL,
            observed_count    INTEGER NOT NULL DEFAULT 1,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );
        CREATE INDEX idx_procedural_user ON procedural_memories(user_id);

        CREATE TABLE memory_summaries (
            summary_id        TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL,
            scope_type        TEXT NOT NULL,
            scope_identifier  TEXT NOT NULL,
            summary_text      TEXT NOT NULL,
            key_facts         TEXT NOT NULL DEFAULT '[]',
            source_episodic   TEXT NOT NULL DEFAULT '[]',
            source_semantic   TEXT NOT NULL DEFAULT '[]',
            embedding         BLOB NOT NULL,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );
        CREATE INDEX idx_summaries_scope
            ON memory_summaries(scope_type, scope_identifier, user_id, created_at);",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
