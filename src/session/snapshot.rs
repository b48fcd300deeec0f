/*!
 * Partial batch state, written when a run is cancelled, paused or rate
 * limited so that a later run can skip the finished units.
 */

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::app_config::TranslationProvider;
use crate::database::models::SnapshotRecord;
use crate::translation::models::{BatchTranslationJob, ItemStatus, StringUnit, TranslationItem};

/// Saved state of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSnapshot {
    pub id: String,
    pub job_id: String,
    pub timestamp: DateTime<Utc>,
    pub source_language: String,
    pub target_language: String,
    pub provider: TranslationProvider,
    /// Successful items
    pub completed: usize,
    pub total: usize,
    pub items: Vec<TranslationItem>,
}

impl BatchSnapshot {
    /// Capture the current state of a job
    ///
    /// A job keeps a single snapshot: the ID is the job ID, so later saves
    /// replace earlier ones.
    pub fn from_job(job: &BatchTranslationJob) -> Self {
        Self {
            id: job.id.clone(),
            job_id: job.id.clone(),
            timestamp: Utc::now(),
            source_language: job.options.source_language.clone(),
            target_language: job.options.target_language.clone(),
            provider: job.options.provider,
            completed: job.items.iter().filter(|item| item.status.is_success()).count(),
            total: job.items.len(),
            items: job.items.clone(),
        }
    }

    /// IDs of units that already have a translation
    pub fn completed_ids(&self) -> HashSet<String> {
        self.items
            .iter()
            .filter(|item| item.status.is_success() && item.translated_text.is_some())
            .map(|item| item.id.clone())
            .collect()
    }

    /// Units still to translate, in their original order
    pub fn pending_units(&self, units: &[StringUnit]) -> Vec<StringUnit> {
        let done = self.completed_ids();
        units.iter().filter(|unit| !done.contains(&unit.id)).cloned().collect()
    }

    /// Translated text per finished unit ID
    pub fn translations(&self) -> HashMap<String, String> {
        self.items
            .iter()
            .filter(|item| item.status.is_success())
            .filter_map(|item| item.translated_text.as_ref().map(|text| (item.id.clone(), text.clone())))
            .collect()
    }

    /// Fold a later snapshot of the same string table into this one
    ///
    /// A resumed run only sees the units left over by earlier runs, so its
    /// snapshot alone does not know about them. Items are matched by unit ID:
    /// the later state wins unless it would replace a finished translation
    /// with an unfinished one. Identity and timestamp come from `later`.
    pub fn merge(&mut self, later: &BatchSnapshot) {
        let mut positions: HashMap<String, usize> = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| (item.id.clone(), index))
            .collect();

        for item in &later.items {
            match positions.get(&item.id) {
                Some(&index) => {
                    if item.status.is_success() || !self.items[index].status.is_success() {
                        self.items[index] = item.clone();
                    }
                }
                None => {
                    positions.insert(item.id.clone(), self.items.len());
                    self.items.push(item.clone());
                }
            }
        }

        self.id = later.id.clone();
        self.job_id = later.job_id.clone();
        self.timestamp = later.timestamp;
        self.completed = self.items.iter().filter(|item| item.status.is_success()).count();
        self.total = self.items.len();
    }

    /// Items that ended in failure
    pub fn failed_items(&self) -> impl Iterator<Item = &TranslationItem> {
        self.items.iter().filter(|item| item.status == ItemStatus::Failed)
    }

    /// Whether every unit has a translation
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }

    /// Pretty JSON export
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize snapshot")
    }

    /// Read a JSON export
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse snapshot JSON")
    }

    /// Database row for this snapshot
    pub fn to_record(&self) -> Result<SnapshotRecord> {
        Ok(SnapshotRecord {
            id: self.id.clone(),
            job_id: self.job_id.clone(),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            provider: self.provider.to_string(),
            completed: self.completed as i64,
            total: self.total as i64,
            payload: serde_json::to_string(self).context("Failed to serialize snapshot")?,
            created_at: self.timestamp.to_rfc3339(),
        })
    }

    /// Rebuild from a database row
    pub fn from_record(record: &SnapshotRecord) -> Result<Self> {
        serde_json::from_str(&record.payload)
            .with_context(|| format!("Corrupted payload for snapshot {}", record.id))
    }
}
