/*!
 * Database schema definitions and migrations.
 *
 * Two tables carry state between runs: `translation_memory` (the persistent
 * cache of finished translations) and `batch_snapshots` (partial batch state
 * written on cancellation, pause or rate limiting).
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Stored in SQLite's `user_version` header field
pub const SCHEMA_VERSION: i32 = 1;

/// Create the tables on a fresh database, refuse databases from newer builds
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    match get_schema_version(conn)? {
        0 => {
            info!("Initializing database schema v{}", SCHEMA_VERSION);
            create_all_tables(conn)?;
            set_schema_version(conn, SCHEMA_VERSION)
        }
        version if version < SCHEMA_VERSION => {
            info!("Migrating database schema from v{} to v{}", version, SCHEMA_VERSION);
            migrate_schema(conn, version)
        }
        version if version > SCHEMA_VERSION => Err(anyhow!(
            "Database schema v{} is newer than this build supports (v{})",
            version,
            SCHEMA_VERSION
        )),
        version => {
            debug!("Database schema is up to date (v{})", version);
            Ok(())
        }
    }
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to read schema version")
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    // PRAGMA arguments cannot be bound as parameters
    conn.execute_batch(&format!("PRAGMA user_version = {}", version))
        .context("Failed to write schema version")
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    // game_context is '' when absent so it can take part in the unique key
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS translation_memory (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_text_hash TEXT NOT NULL,
            source_text TEXT NOT NULL,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            game_context TEXT NOT NULL DEFAULT '',
            translated_text TEXT NOT NULL,
            provider TEXT NOT NULL,
            game_id TEXT,
            verified INTEGER NOT NULL DEFAULT 0,
            usage_count INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            last_used_at TEXT NOT NULL,
            UNIQUE(source_text_hash, source_language, target_language, game_context)
        );

        CREATE INDEX IF NOT EXISTS idx_memory_languages ON translation_memory(source_language, target_language);
        CREATE INDEX IF NOT EXISTS idx_memory_provider ON translation_memory(provider);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS batch_snapshots (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            provider TEXT NOT NULL,
            completed INTEGER NOT NULL,
            total INTEGER NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_snapshots_lookup ON batch_snapshots(source_language, target_language, provider);
        CREATE INDEX IF NOT EXISTS idx_snapshots_job ON batch_snapshots(job_id);
        "#,
    )?;

    Ok(())
}

fn migrate_schema(_conn: &Connection, from_version: i32) -> Result<()> {
    // v1 is the first released schema
    Err(anyhow!("No migration path from schema v{}", from_version))
}
