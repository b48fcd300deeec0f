/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

use super::connection::DatabaseConnection;
use super::models::{MemoryKey, MemoryStats, SnapshotRecord, TranslationMemoryEntry};

/// Outcome of a per-entry batch insert
#[derive(Debug, Clone, Default)]
pub struct BatchInsertReport {
    /// Entries written
    pub inserted: usize,
    /// Entries that failed, with the reason
    pub failures: Vec<(MemoryKey, String)>,
}

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

const MEMORY_COLUMNS: &str = "source_text, source_language, target_language, game_context, translated_text, \
     provider, game_id, verified, usage_count, created_at, last_used_at";

const SNAPSHOT_COLUMNS: &str =
    "id, job_id, source_language, target_language, provider, completed, total, payload, created_at";

fn memory_from_row(row: &Row) -> rusqlite::Result<TranslationMemoryEntry> {
    let game_context: String = row.get(3)?;
    Ok(TranslationMemoryEntry {
        source_text: row.get(0)?,
        source_language: row.get(1)?,
        target_language: row.get(2)?,
        game_context: if game_context.is_empty() { None } else { Some(game_context) },
        translated_text: row.get(4)?,
        provider: row.get(5)?,
        game_id: row.get(6)?,
        verified: row.get(7)?,
        usage_count: row.get(8)?,
        created_at: row.get(9)?,
        last_used_at: row.get(10)?,
    })
}

fn snapshot_from_row(row: &Row) -> rusqlite::Result<SnapshotRecord> {
    Ok(SnapshotRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        source_language: row.get(2)?,
        target_language: row.get(3)?,
        provider: row.get(4)?,
        completed: row.get(5)?,
        total: row.get(6)?,
        payload: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Upsert one entry; an existing row gets its usage bumped instead of a duplicate.
/// Verified rows keep their text.
fn upsert_memory_sync(conn: &Connection, entry: &TranslationMemoryEntry) -> rusqlite::Result<usize> {
    let key = entry.key();
    conn.execute(
        r#"
        INSERT INTO translation_memory (
            source_text_hash, source_text, source_language, target_language, game_context,
            translated_text, provider, game_id, verified, usage_count, created_at, last_used_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(source_text_hash, source_language, target_language, game_context)
        DO UPDATE SET
            usage_count = translation_memory.usage_count + 1,
            last_used_at = excluded.last_used_at,
            translated_text = CASE WHEN translation_memory.verified = 1
                THEN translation_memory.translated_text ELSE excluded.translated_text END,
            provider = CASE WHEN translation_memory.verified = 1
                THEN translation_memory.provider ELSE excluded.provider END,
            verified = MAX(translation_memory.verified, excluded.verified)
        "#,
        params![
            key.source_hash(),
            entry.source_text,
            entry.source_language,
            entry.target_language,
            key.context_column(),
            entry.translated_text,
            entry.provider,
            entry.game_id,
            entry.verified,
            entry.usage_count.max(1),
            entry.created_at,
            chrono::Utc::now().to_rfc3339(),
        ],
    )
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Translation Memory Operations
    // =========================================================================

    /// Exact lookup; does not touch usage counters
    pub async fn lookup_memory(&self, key: &MemoryKey) -> Result<Option<TranslationMemoryEntry>> {
        let key = key.clone();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM translation_memory
                     WHERE source_text_hash = ?1 AND source_text = ?2
                       AND source_language = ?3 AND target_language = ?4
                       AND game_context = ?5",
                    MEMORY_COLUMNS
                );
                let entry = conn
                    .query_row(
                        &sql,
                        params![
                            key.source_hash(),
                            key.source_text,
                            key.source_language,
                            key.target_language,
                            key.context_column()
                        ],
                        memory_from_row,
                    )
                    .optional()?;
                Ok(entry)
            })
            .await
    }

    /// Insert or refresh a single entry
    pub async fn upsert_memory(&self, entry: &TranslationMemoryEntry) -> Result<()> {
        let entry = entry.clone();

        self.db
            .execute_async(move |conn| {
                upsert_memory_sync(conn, &entry)?;
                Ok(())
            })
            .await
    }

    /// Insert or refresh many entries; a failing entry does not stop the rest
    pub async fn upsert_memory_batch(&self, entries: Vec<TranslationMemoryEntry>) -> Result<BatchInsertReport> {
        self.db
            .execute_async(move |conn| {
                let mut report = BatchInsertReport::default();
                for entry in &entries {
                    match upsert_memory_sync(conn, entry) {
                        Ok(_) => report.inserted += 1,
                        Err(e) => {
                            warn!("Failed to store memory entry '{}': {}", entry.source_text, e);
                            report.failures.push((entry.key(), e.to_string()));
                        }
                    }
                }
                Ok(report)
            })
            .await
    }

    /// Insert entries that are not in the memory yet, skipping existing keys
    pub async fn insert_memory_if_absent(&self, entries: Vec<TranslationMemoryEntry>) -> Result<usize> {
        self.db
            .transaction_async(move |tx| {
                let mut inserted = 0;
                for entry in &entries {
                    let key = entry.key();
                    inserted += tx.execute(
                        r#"
                        INSERT OR IGNORE INTO translation_memory (
                            source_text_hash, source_text, source_language, target_language, game_context,
                            translated_text, provider, game_id, verified, usage_count, created_at, last_used_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                        "#,
                        params![
                            key.source_hash(),
                            entry.source_text,
                            entry.source_language,
                            entry.target_language,
                            key.context_column(),
                            entry.translated_text,
                            entry.provider,
                            entry.game_id,
                            entry.verified,
                            entry.usage_count,
                            entry.created_at,
                            entry.last_used_at,
                        ],
                    )?;
                }
                Ok(inserted)
            })
            .await
    }

    /// Bump usage after a cache hit
    pub async fn record_memory_hit(&self, key: &MemoryKey) -> Result<bool> {
        let key = key.clone();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    r#"
                    UPDATE translation_memory
                    SET usage_count = usage_count + 1, last_used_at = ?6
                    WHERE source_text_hash = ?1 AND source_text = ?2
                      AND source_language = ?3 AND target_language = ?4
                      AND game_context = ?5
                    "#,
                    params![
                        key.source_hash(),
                        key.source_text,
                        key.source_language,
                        key.target_language,
                        key.context_column(),
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )?;
                debug!("Recorded memory hit ({} row)", updated);
                Ok(updated > 0)
            })
            .await
    }

    /// Set or clear the verified flag
    pub async fn set_memory_verified(&self, key: &MemoryKey, verified: bool) -> Result<bool> {
        let key = key.clone();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    r#"
                    UPDATE translation_memory SET verified = ?6
                    WHERE source_text_hash = ?1 AND source_text = ?2
                      AND source_language = ?3 AND target_language = ?4
                      AND game_context = ?5
                    "#,
                    params![
                        key.source_hash(),
                        key.source_text,
                        key.source_language,
                        key.target_language,
                        key.context_column(),
                        verified,
                    ],
                )?;
                Ok(updated > 0)
            })
            .await
    }

    /// All entries for a language pair, most used first
    pub async fn memory_entries(&self, source_language: &str, target_language: &str) -> Result<Vec<TranslationMemoryEntry>> {
        let source_language = source_language.trim().to_lowercase();
        let target_language = target_language.trim().to_lowercase();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM translation_memory
                     WHERE source_language = ?1 AND target_language = ?2
                     ORDER BY usage_count DESC, id ASC",
                    MEMORY_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map(params![source_language, target_language], memory_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(entries)
            })
            .await
    }

    /// Get translation memory statistics
    pub async fn memory_stats(&self) -> Result<MemoryStats> {
        self.db
            .execute_async(|conn| {
                let (total_entries, verified_entries, total_usage): (i64, i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(verified), 0), COALESCE(SUM(usage_count), 0) FROM translation_memory",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;

                let mut stmt = conn.prepare("SELECT provider, COUNT(*) FROM translation_memory GROUP BY provider")?;
                let entries_by_provider = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

                Ok(MemoryStats {
                    total_entries,
                    verified_entries,
                    total_usage,
                    entries_by_provider,
                })
            })
            .await
    }

    // =========================================================================
    // Snapshot Operations
    // =========================================================================

    /// Insert or replace a snapshot
    pub async fn save_snapshot(&self, record: &SnapshotRecord) -> Result<()> {
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT OR REPLACE INTO batch_snapshots (
                        id, job_id, source_language, target_language, provider,
                        completed, total, payload, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                    params![
                        record.id,
                        record.job_id,
                        record.source_language,
                        record.target_language,
                        record.provider,
                        record.completed,
                        record.total,
                        record.payload,
                        record.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get a snapshot by ID
    pub async fn get_snapshot(&self, id: &str) -> Result<Option<SnapshotRecord>> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!("SELECT {} FROM batch_snapshots WHERE id = ?1", SNAPSHOT_COLUMNS);
                Ok(conn.query_row(&sql, [id], snapshot_from_row).optional()?)
            })
            .await
    }

    /// Most recent snapshot for a language pair and provider
    pub async fn latest_snapshot(
        &self,
        source_language: &str,
        target_language: &str,
        provider: &str,
    ) -> Result<Option<SnapshotRecord>> {
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();
        let provider = provider.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM batch_snapshots
                     WHERE source_language = ?1 AND target_language = ?2 AND provider = ?3
                     ORDER BY created_at DESC, rowid DESC LIMIT 1",
                    SNAPSHOT_COLUMNS
                );
                Ok(conn
                    .query_row(&sql, params![source_language, target_language, provider], snapshot_from_row)
                    .optional()?)
            })
            .await
    }

    /// Every snapshot for a language pair and provider, oldest first
    pub async fn snapshots_for(
        &self,
        source_language: &str,
        target_language: &str,
        provider: &str,
    ) -> Result<Vec<SnapshotRecord>> {
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();
        let provider = provider.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM batch_snapshots
                     WHERE source_language = ?1 AND target_language = ?2 AND provider = ?3
                     ORDER BY created_at ASC, rowid ASC",
                    SNAPSHOT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map(params![source_language, target_language, provider], snapshot_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
    }

    /// All snapshots, newest first
    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        self.db
            .execute_async(|conn| {
                let sql = format!(
                    "SELECT {} FROM batch_snapshots ORDER BY created_at DESC, rowid DESC",
                    SNAPSHOT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map([], snapshot_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
    }

    /// Delete a snapshot, returning whether it existed
    pub async fn delete_snapshot(&self, id: &str) -> Result<bool> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM batch_snapshots WHERE id = ?1", [id])?;
                Ok(deleted > 0)
            })
            .await
    }
}
