//! v005: domain ontology declarations and the system_config key-value table.

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE domain_ontology (
            from_entity_type  TEXT NOT NULL,
            to_entity_type    TEXT NOT NULL,
            relation_type     TEXT NOT NULL,
            from_table        TEXT NOT NULL,
            from_field        TEXT NOT NULL,
            to_table          TEXT NOT NULL,
            to_field          TEXT NOT NULL,
            cardinality       TEXT NOT NULL,
            PRIMARY KEY (from_entity_type, to_entity_type, relation_type)
        );

        CREATE TABLE system_config (
            key         TEXT PRIMARY KEY,
            value       TEXT NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
