use anyhow::Result;
use log::{debug, warn};

use super::snapshot::BatchSnapshot;
use crate::app_config::TranslationProvider;
use crate::database::models::SnapshotRecord;
use crate::database::Repository;

/// Snapshot persistence in the translation memory database
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    repo: Repository,
}

impl SnapshotStore {
    /// Create a store over an existing repository
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a store with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(Repository::new_in_memory()?))
    }

    /// Insert or replace a snapshot
    pub async fn save(&self, snapshot: &BatchSnapshot) -> Result<()> {
        self.repo.save_snapshot(&snapshot.to_record()?).await?;
        debug!(
            "Saved snapshot {} ({}/{} done)",
            snapshot.id, snapshot.completed, snapshot.total
        );
        Ok(())
    }

    /// Load a snapshot by ID
    pub async fn get(&self, id: &str) -> Result<Option<BatchSnapshot>> {
        self.repo
            .get_snapshot(id)
            .await?
            .map(|record| BatchSnapshot::from_record(&record))
            .transpose()
    }

    /// Most recent snapshot for a language pair and provider
    pub async fn latest(
        &self,
        source_language: &str,
        target_language: &str,
        provider: TranslationProvider,
    ) -> Result<Option<BatchSnapshot>> {
        self.repo
            .latest_snapshot(source_language, target_language, &provider.to_string())
            .await?
            .map(|record| BatchSnapshot::from_record(&record))
            .transpose()
    }

    /// Combined state of every run for a language pair and provider
    ///
    /// Each resumed run snapshots only the units it was given, so the
    /// snapshots of a chain of interrupted runs are merged oldest first.
    /// The result carries the ID of the newest snapshot.
    pub async fn resume_state(
        &self,
        source_language: &str,
        target_language: &str,
        provider: TranslationProvider,
    ) -> Result<Option<BatchSnapshot>> {
        let records = self
            .repo
            .snapshots_for(source_language, target_language, &provider.to_string())
            .await?;

        let mut merged: Option<BatchSnapshot> = None;
        for record in &records {
            let snapshot = BatchSnapshot::from_record(record)?;
            match merged.as_mut() {
                Some(state) => state.merge(&snapshot),
                None => merged = Some(snapshot),
            }
        }
        if records.len() > 1 {
            debug!("Merged {} snapshots for {} -> {} ({})", records.len(), source_language, target_language, provider);
        }
        Ok(merged)
    }

    /// Delete every snapshot for a language pair and provider
    pub async fn delete_for(
        &self,
        source_language: &str,
        target_language: &str,
        provider: TranslationProvider,
    ) -> Result<usize> {
        let records = self
            .repo
            .snapshots_for(source_language, target_language, &provider.to_string())
            .await?;

        let mut deleted = 0;
        for record in &records {
            if self.repo.delete_snapshot(&record.id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Summary rows of all snapshots, newest first
    ///
    /// Rows are returned without decoding the payload.
    pub async fn list(&self) -> Result<Vec<SnapshotRecord>> {
        self.repo.list_snapshots().await
    }

    /// Delete a snapshot, returning whether it existed
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.repo.delete_snapshot(id).await?;
        if !deleted {
            warn!("Snapshot {} not found", id);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::models::{BatchOptions, BatchTranslationJob, StringUnit};

    fn snapshot_for(provider: TranslationProvider) -> BatchSnapshot {
        let units = vec![StringUnit::new("1", "title", "Main Menu", 0)];
        let options = BatchOptions::new("en", "fr", provider, "key");
        BatchSnapshot::from_job(&BatchTranslationJob::new(options, &units))
    }

    #[tokio::test]
    async fn test_saveAndGet_shouldReturnSameSnapshot() {
        let store = SnapshotStore::new_in_memory().unwrap();
        let snapshot = snapshot_for(TranslationProvider::DeepL);

        store.save(&snapshot).await.unwrap();

        let loaded = store.get(&snapshot.id).await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_latest_shouldFilterByProvider() {
        let store = SnapshotStore::new_in_memory().unwrap();
        store.save(&snapshot_for(TranslationProvider::DeepL)).await.unwrap();
        let google = snapshot_for(TranslationProvider::Google);
        store.save(&google).await.unwrap();

        let latest = store.latest("en", "fr", TranslationProvider::Google).await.unwrap().unwrap();
        assert_eq!(latest.id, google.id);
        assert!(store.latest("en", "de", TranslationProvider::Google).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleteFor_shouldOnlyRemoveMatchingSnapshots() {
        let store = SnapshotStore::new_in_memory().unwrap();
        store.save(&snapshot_for(TranslationProvider::DeepL)).await.unwrap();
        store.save(&snapshot_for(TranslationProvider::DeepL)).await.unwrap();
        store.save(&snapshot_for(TranslationProvider::Google)).await.unwrap();

        assert_eq!(store.delete_for("en", "fr", TranslationProvider::DeepL).await.unwrap(), 2);
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert!(store.resume_state("en", "fr", TranslationProvider::DeepL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_shouldRemoveSnapshot() {
        let store = SnapshotStore::new_in_memory().unwrap();
        let snapshot = snapshot_for(TranslationProvider::OpenAI);
        store.save(&snapshot).await.unwrap();

        assert!(store.delete(&snapshot.id).await.unwrap());
        assert!(!store.delete(&snapshot.id).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }
}
