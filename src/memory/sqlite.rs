use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::path::Path;

use super::{truncate_text, BatchInsertReport, MemoryKey, MemoryStats, TranslationMemory, TranslationMemoryEntry};
use crate::database::{DatabaseConnection, Repository};

/// SQLite-backed translation memory
#[derive(Debug, Clone)]
pub struct SqliteTranslationMemory {
    repository: Repository,
}

impl SqliteTranslationMemory {
    /// Wrap an existing repository (shared with the snapshot store)
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Repository::new(DatabaseConnection::new(path)?)))
    }

    /// In-memory SQLite database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(Repository::new_in_memory()?))
    }

    /// Underlying repository
    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}

#[async_trait]
impl TranslationMemory for SqliteTranslationMemory {
    async fn lookup(&self, key: &MemoryKey) -> Result<Option<TranslationMemoryEntry>> {
        let entry = self.repository.lookup_memory(key).await?;
        debug!(
            "Memory {} for '{}' ({} -> {})",
            if entry.is_some() { "hit" } else { "miss" },
            truncate_text(&key.source_text, 30),
            key.source_language,
            key.target_language
        );
        Ok(entry)
    }

    async fn insert(&self, entry: TranslationMemoryEntry) -> Result<()> {
        self.repository.upsert_memory(&entry).await
    }

    async fn insert_batch(&self, entries: Vec<TranslationMemoryEntry>) -> Result<BatchInsertReport> {
        self.repository.upsert_memory_batch(entries).await
    }

    async fn record_hit(&self, key: &MemoryKey) -> Result<bool> {
        self.repository.record_memory_hit(key).await
    }

    async fn set_verified(&self, key: &MemoryKey, verified: bool) -> Result<bool> {
        self.repository.set_memory_verified(key, verified).await
    }

    async fn entries(&self, source_language: &str, target_language: &str) -> Result<Vec<TranslationMemoryEntry>> {
        self.repository.memory_entries(source_language, target_language).await
    }

    async fn import(&self, entries: Vec<TranslationMemoryEntry>) -> Result<usize> {
        self.repository.insert_memory_if_absent(entries).await
    }

    async fn stats(&self) -> Result<MemoryStats> {
        self.repository.memory_stats().await
    }
}
