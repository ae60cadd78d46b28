//! Cache index migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order. The legacy re-key migration is conditional: it
//! only touches indexes written by the older single-column key scheme.

use rusqlite::{params, Connection};

use crate::cache::key::{prompt_digest, DEFAULT_PROMPT};

use super::error::DatabaseError;

const CACHE_TABLE: &str = "ai_image_cache";
/// Left behind by an interrupted rename/create/copy/drop sequence.
const INTERRUPTED_TABLE: &str = "ai_image_cache_old";
const LEGACY_STAGING_TABLE: &str = "ai_image_cache_legacy";

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    kind: MigrationKind,
}

enum MigrationKind {
    /// Execute the SQL directly.
    Standard(&'static str),
    /// Move rows keyed by `input_hash` alone into the composite-key table.
    RekeyLegacyCache,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_ai_image_cache",
        kind: MigrationKind::Standard(include_str!("sql/001_create_ai_image_cache.sql")),
    },
    Migration {
        version: 2,
        description: "rekey_legacy_ai_image_cache",
        kind: MigrationKind::RekeyLegacyCache,
    },
];

/// Runs all pending migrations on the given connection.
///
/// Each migration and its version marker commit in one transaction, so a
/// crash leaves the index either fully before or fully after a step.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        let tx = conn.unchecked_transaction()?;

        let applied = match &migration.kind {
            MigrationKind::Standard(sql) => tx.execute_batch(sql).map(|_| true),
            MigrationKind::RekeyLegacyCache => rekey_legacy_cache(&tx),
        }
        .map_err(|e| DatabaseError::Migration {
            version: migration.version,
            description: migration.description,
            reason: e.to_string(),
        })?;

        if !applied {
            log::info!(
                "Skipping migration v{} (condition not met)",
                migration.version
            );
        }

        tx.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            params![migration.version, migration.description],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// Re-keys a legacy index in place. Returns `false` when there is nothing
/// to migrate.
fn rekey_legacy_cache(conn: &Connection) -> Result<bool, rusqlite::Error> {
    let legacy = primary_key_column(conn, CACHE_TABLE)?.as_deref() == Some("input_hash");
    let interrupted = table_exists(conn, INTERRUPTED_TABLE)?;

    if !legacy && !interrupted {
        return Ok(false);
    }

    let mut sources = Vec::new();
    if interrupted {
        log::warn!("Resuming interrupted cache migration from {INTERRUPTED_TABLE}");
        sources.push(INTERRUPTED_TABLE);
    }
    if legacy {
        conn.execute_batch(&format!(
            "ALTER TABLE {CACHE_TABLE} RENAME TO {LEGACY_STAGING_TABLE};"
        ))?;
        sources.push(LEGACY_STAGING_TABLE);
    }

    conn.execute_batch(include_str!("sql/001_create_ai_image_cache.sql"))?;

    let default_digest = prompt_digest(DEFAULT_PROMPT);
    for source in sources {
        let copied = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {CACHE_TABLE}
                    (cache_key, input_hash, prompt, output_filename, mime_type, created_at)
                 SELECT input_hash || ':' || ?1, input_hash, ?2, output_filename, mime_type, created_at
                 FROM {source}"
            ),
            params![default_digest, DEFAULT_PROMPT],
        )?;
        conn.execute_batch(&format!("DROP TABLE {source};"))?;
        log::info!("Migrated {copied} cache entries from {source}");
    }

    Ok(true)
}

/// Returns the name of the single-column primary key of `table`, if any.
fn primary_key_column(conn: &Connection, table: &str) -> Result<Option<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) WHERE pk = 1")?;
    let mut rows = stmt.query_map(params![table], |r| r.get::<_, String>(0))?;
    let first = rows.next().transpose();
    first
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, rusqlite::Error> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}
