use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{truncate_text, BatchInsertReport, MemoryKey, MemoryStats, TranslationMemory, TranslationMemoryEntry};

/// Process-local translation memory
///
/// Same semantics as the SQLite store, without persistence. Clones share
/// their storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTranslationMemory {
    /// Entries by key, with insertion order for stable listings
    entries: Arc<RwLock<HashMap<MemoryKey, (usize, TranslationMemoryEntry)>>>,
}

impl InMemoryTranslationMemory {
    /// Create an empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the memory holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn upsert(&self, entry: TranslationMemoryEntry) {
        let mut entries = self.entries.write();
        let next_index = entries.len();
        let now = chrono::Utc::now().to_rfc3339();

        match entries.entry(entry.key()) {
            Entry::Occupied(mut slot) => {
                let (_, existing) = slot.get_mut();
                existing.usage_count += 1;
                existing.last_used_at = now;
                if !existing.verified {
                    existing.translated_text = entry.translated_text;
                    existing.provider = entry.provider;
                }
                existing.verified |= entry.verified;
            }
            Entry::Vacant(slot) => {
                debug!("Stored translation for '{}'", truncate_text(&entry.source_text, 30));
                slot.insert((next_index, entry));
            }
        }
    }
}

#[async_trait]
impl TranslationMemory for InMemoryTranslationMemory {
    async fn lookup(&self, key: &MemoryKey) -> Result<Option<TranslationMemoryEntry>> {
        Ok(self.entries.read().get(key).map(|(_, entry)| entry.clone()))
    }

    async fn insert(&self, entry: TranslationMemoryEntry) -> Result<()> {
        self.upsert(entry);
        Ok(())
    }

    async fn insert_batch(&self, entries: Vec<TranslationMemoryEntry>) -> Result<BatchInsertReport> {
        let inserted = entries.len();
        for entry in entries {
            self.upsert(entry);
        }
        Ok(BatchInsertReport { inserted, failures: Vec::new() })
    }

    async fn record_hit(&self, key: &MemoryKey) -> Result<bool> {
        let mut entries = self.entries.write();
        Ok(match entries.get_mut(key) {
            Some((_, entry)) => {
                entry.usage_count += 1;
                entry.last_used_at = chrono::Utc::now().to_rfc3339();
                true
            }
            None => false,
        })
    }

    async fn set_verified(&self, key: &MemoryKey, verified: bool) -> Result<bool> {
        let mut entries = self.entries.write();
        Ok(match entries.get_mut(key) {
            Some((_, entry)) => {
                entry.verified = verified;
                true
            }
            None => false,
        })
    }

    async fn entries(&self, source_language: &str, target_language: &str) -> Result<Vec<TranslationMemoryEntry>> {
        let source_language = source_language.trim().to_lowercase();
        let target_language = target_language.trim().to_lowercase();

        let mut matching: Vec<(usize, TranslationMemoryEntry)> = self
            .entries
            .read()
            .values()
            .filter(|(_, e)| e.source_language == source_language && e.target_language == target_language)
            .cloned()
            .collect();
        matching.sort_by(|(ia, a), (ib, b)| b.usage_count.cmp(&a.usage_count).then(ia.cmp(ib)));

        Ok(matching.into_iter().map(|(_, e)| e).collect())
    }

    async fn import(&self, entries: Vec<TranslationMemoryEntry>) -> Result<usize> {
        let mut stored = self.entries.write();
        let mut inserted = 0;
        for entry in entries {
            let key = entry.key();
            if !stored.contains_key(&key) {
                let index = stored.len();
                stored.insert(key, (index, entry));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn stats(&self) -> Result<MemoryStats> {
        let entries = self.entries.read();
        let mut entries_by_provider = BTreeMap::new();
        for (_, entry) in entries.values() {
            *entries_by_provider.entry(entry.provider.clone()).or_insert(0) += 1;
        }

        Ok(MemoryStats {
            total_entries: entries.len() as i64,
            verified_entries: entries.values().filter(|(_, e)| e.verified).count() as i64,
            total_usage: entries.values().map(|(_, e)| e.usage_count).sum(),
            entries_by_provider,
        })
    }
}
