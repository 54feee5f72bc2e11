//! v002: canonical entities and aliases.
//!
//! `user_scope` uses '' for global aliases so the `(alias_text, user_scope)`
//! uniqueness survives SQLite's NULLs-are-distinct rule.

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE canonical_entities (
            entity_id              TEXT PRIMARY KEY,
            entity_type            TEXT NOT NULL,
            canonical_name         TEXT NOT NULL,
            canonical_name_folded  TEXT NOT NULL,
            properties             TEXT NOT NULL DEFAULT '{}',
            external_table         TEXT,
            external_key           TEXT,
            created_by_user_id     TEXT,
            created_at             TEXT NOT NULL,
            updated_at             TEXT NOT NULL
        );
        CREATE UNIQUE INDEX idx_entities_external_ref
            ON canonical_entities(external_table, external_key)
            WHERE external_table IS NOT NULL;
        CREATE INDEX idx_entities_name_folded ON canonical_entities(canonical_name_folded);
        CREATE INDEX idx_entities_type ON canonical_entities(entity_type);

        CREATE TABLE entity_aliases (
            alias_id             TEXT PRIMARY KEY,
            canonical_entity_id  TEXT NOT NULL REFERENCES canonical_entities(entity_id),
            alias_text           TEXT NOT NULL,
            source               TEXT NOT NULL,
            user_scope           TEXT NOT NULL DEFAULT '',
            confidence           REAL NOT NULL,
            metadata             TEXT NOT NULL DEFAULT '{}',
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL,
            UNIQUE(alias_text, user_scope)
        );
        CREATE INDEX idx_aliases_entity ON entity_aliases(canonical_entity_id);",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
