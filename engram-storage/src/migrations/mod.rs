//! Migration runner — version tracking, forward-only, transactional per migration.

mod v001_chat_events;
mod v002_entity_tables;
mod v003_memory_tables;
mod v004_conflict_tables;
mod v005_ontology_config;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use engram_core::EngramResult;

use crate::to_storage_err;

/// Total number of migrations.
pub const LATEST_VERSION: u32 = 5;

/// All migrations in order. Index 0 = v001, etc.
type MigrationFn = fn(&Connection) -> EngramResult<()>;

const MIGRATIONS: [(u32, &str, MigrationFn); 5] = [
    (1, "chat_events", v001_chat_events::migrate),
    (2, "entity_tables", v002_entity_tables::migrate),
    (3, "memory_tables", v003_memory_tables::migrate),
    (4, "conflict_tables", v004_conflict_tables::migrate),
    (5, "ontology_config", v005_ontology_config::migrate),
];

/// Get the current schema version from the database.
/// Returns 0 if the schema_version table doesn't exist yet.
pub fn current_version(conn: &Connection) -> EngramResult<u32> {
    let exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'")
        .and_then(|mut stmt| stmt.exists([]))
        .map_err(|e| to_storage_err(e.to_string()))?;

    if !exists {
        conn.execute_batch(
            "CREATE TABLE schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        return Ok(0);
    }

    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(version)
}

/// Run all pending migrations. Forward-only, each wrapped in a transaction.
pub fn run_migrations(conn: &Connection) -> EngramResult<u32> {
    let current = current_version(conn)?;
    let mut applied = 0;

    if current >= LATEST_VERSION {
        debug!(target: "engram_storage", "database schema is up to date (v{current})");
        return Ok(0);
    }

    info!(target: "engram_storage", "running migrations: v{} → v{}", current, LATEST_VERSION);

    for &(version, name, migrate_fn) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        debug!(target: "engram_storage", "applying migration v{version:03}: {name}");

        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| to_storage_err(format!("begin transaction for v{version:03}: {e}")))?;

        match migrate_fn(conn) {
            Ok(()) => {
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    [version],
                )
                .map_err(|e| to_storage_err(format!("record version v{version:03}: {e}")))?;

                conn.execute_batch("COMMIT")
                    .map_err(|e| to_storage_err(format!("commit v{version:03}: {e}")))?;

                info!(target: "engram_storage", "applied migration v{version:03}: {name}");
                applied += 1;
            }
            Err(e) => {
                warn!(target: "engram_storage", "migration v{version:03} failed: {e}, rolling back");
                let _ = conn.execute_batch("ROLLBACK");
                return Err(engram_core::EngramError::Storage(
                    engram_core::errors::StorageError::MigrationFailed {
                        version,
                        reason: e.to_string(),
                    },
                ));
            }
        }
    }

    info!(target: "engram_storage", "applied {applied} migration(s), now at v{LATEST_VERSION}");
    Ok(applied)
}
