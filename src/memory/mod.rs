/*!
 * Translation memory.
 *
 * A persistent cache of finished translations keyed by normalized source
 * text, language pair and optional game context. Matching is exact after
 * normalization. Two stores implement the same trait:
 * - `SqliteTranslationMemory`: the persistent store, one serialized connection
 * - `InMemoryTranslationMemory`: process-local store for tests and cache-only runs
 *
 * The `tmx` module exchanges memories with other tools as TMX 1.4.
 */

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Debug;

pub use crate::database::models::{MemoryKey, MemoryStats, TranslationMemoryEntry};
pub use crate::database::BatchInsertReport;

pub mod in_memory;
pub mod sqlite;
pub mod tmx;

pub use in_memory::InMemoryTranslationMemory;
pub use sqlite::SqliteTranslationMemory;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize source text for memory matching: trim and collapse whitespace runs
pub fn normalize_source(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Shorten text for log lines
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// Store of remembered translations
///
/// `lookup` is a pure read; the orchestrator calls `record_hit` after using
/// a cached value. All writes on one store are serialized.
#[async_trait]
pub trait TranslationMemory: Send + Sync + Debug {
    /// Exact lookup after normalization
    async fn lookup(&self, key: &MemoryKey) -> Result<Option<TranslationMemoryEntry>>;

    /// Insert an entry, or bump usage and refresh `last_used_at` when the key exists
    async fn insert(&self, entry: TranslationMemoryEntry) -> Result<()>;

    /// Insert many entries; one failing entry does not block the others
    async fn insert_batch(&self, entries: Vec<TranslationMemoryEntry>) -> Result<BatchInsertReport>;

    /// Bump usage after a cache hit; returns whether the key exists
    async fn record_hit(&self, key: &MemoryKey) -> Result<bool>;

    /// Set or clear the verified flag; returns whether the key exists
    async fn set_verified(&self, key: &MemoryKey, verified: bool) -> Result<bool>;

    /// All entries for a language pair, most used first
    async fn entries(&self, source_language: &str, target_language: &str) -> Result<Vec<TranslationMemoryEntry>>;

    /// Insert entries whose key is unknown; returns how many were added
    async fn import(&self, entries: Vec<TranslationMemoryEntry>) -> Result<usize>;

    /// Aggregate statistics
    async fn stats(&self) -> Result<MemoryStats>;

    /// Convenience lookup from raw parts
    async fn lookup_text(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        game_context: Option<&str>,
    ) -> Result<Option<TranslationMemoryEntry>> {
        let key = MemoryKey::new(source_text, source_language, target_language, game_context);
        self.lookup(&key).await
    }
}
