/*!
 * Data model of a batch translation run.
 *
 * `StringUnit`s come from a parser and never change. The orchestrator turns
 * each one into a `TranslationItem`, keeps `BatchProgress` current after
 * every transition, and returns a `BatchTranslationJob` with the items and
 * aggregated `JobResults`.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::TranslationProvider;
use crate::errors::TranslationError;
use crate::validation::QualityIssue;

/// Serde helpers storing a `Duration` as integer milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// One localizable string extracted from a game file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringUnit {
    /// Unique within a run
    pub id: String,
    /// Key in the source file
    pub key: String,
    pub source_text: String,
    /// Hint for translators, such as a UI location or speaker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Position in the source file
    pub original_position: usize,
}

impl StringUnit {
    pub fn new(id: impl Into<String>, key: impl Into<String>, source_text: impl Into<String>, position: usize) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            source_text: source_text.into(),
            context: None,
            original_position: position,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Status of a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemStatus {
    Pending,
    Translating,
    Completed,
    Failed,
    /// Completed from the translation memory
    FromMemory,
    /// Blank source, nothing to translate
    Skipped,
}

impl ItemStatus {
    /// Terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::FromMemory | Self::Skipped)
    }

    /// Whether the item ended with a usable translation
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::FromMemory)
    }
}

/// A unit being translated, and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationItem {
    pub id: String,
    pub key: String,
    pub source_text: String,
    #[serde(default)]
    pub translated_text: Option<String>,
    pub status: ItemStatus,
    #[serde(default)]
    pub from_memory: bool,
    #[serde(default)]
    pub quality_issues: Vec<QualityIssue>,
    /// Score of the checked translation, when checks ran
    #[serde(default)]
    pub quality_score: Option<u32>,
    /// Last failure message
    #[serde(default)]
    pub error: Option<String>,
    /// Provider calls made for this item
    #[serde(default)]
    pub attempts: u32,
}

impl TranslationItem {
    /// Fresh pending item for a unit
    pub fn pending(unit: &StringUnit) -> Self {
        Self {
            id: unit.id.clone(),
            key: unit.key.clone(),
            source_text: unit.source_text.clone(),
            translated_text: None,
            status: ItemStatus::Pending,
            from_memory: false,
            quality_issues: Vec::new(),
            quality_score: None,
            error: None,
            attempts: 0,
        }
    }
}

/// Live counters of a run, recomputed after every item transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub total: usize,
    /// Successful items, memory hits included
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub from_memory: usize,
    pub percentage: f64,
    pub is_rate_limited: bool,
    #[serde(default)]
    pub status_message: Option<String>,
    /// Source text of the item that changed last
    #[serde(default)]
    pub current_item: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub estimated_seconds_remaining: Option<u64>,
}

impl BatchProgress {
    /// Zeroed progress for `total` units
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            skipped: 0,
            from_memory: 0,
            percentage: if total == 0 { 100.0 } else { 0.0 },
            is_rate_limited: false,
            status_message: None,
            current_item: None,
            start_time: Utc::now(),
            estimated_seconds_remaining: None,
        }
    }

    /// Items in a terminal state
    pub fn processed(&self) -> usize {
        self.completed + self.failed + self.skipped
    }

    /// Refresh percentage and remaining-time estimate from the counters
    pub fn recompute(&mut self) {
        let processed = self.processed();
        self.percentage = if self.total == 0 {
            100.0
        } else {
            processed as f64 * 100.0 / self.total as f64
        };

        let remaining = self.total.saturating_sub(processed);
        self.estimated_seconds_remaining = if processed == 0 || remaining == 0 {
            None
        } else {
            let elapsed = (Utc::now() - self.start_time).num_milliseconds().max(0) as f64;
            Some((elapsed / processed as f64 * remaining as f64 / 1000.0).round() as u64)
        };
    }
}

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Pending,
    Running,
    RateLimited,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::RateLimited => "rate limited",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// Aggregated outcome of a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResults {
    pub total_items: usize,
    pub translated_items: usize,
    pub failed_items: usize,
    pub skipped_items: usize,
    pub from_memory_items: usize,
    /// Mean score over checked items; `None` when nothing was checked
    pub average_quality_score: Option<f64>,
    /// USD, from realized provider calls
    pub estimated_cost: f64,
    pub quality_issues: Vec<QualityIssue>,
    pub provider_calls: usize,
    pub rate_limit_events: usize,
}

/// Options of one batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    pub source_language: String,
    pub target_language: String,
    pub provider: TranslationProvider,
    /// Never written to snapshots or reports
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub use_translation_memory: bool,
    pub run_quality_checks: bool,
    #[serde(default)]
    pub game_id: Option<String>,
    /// Passed to the provider and part of the memory key
    #[serde(default)]
    pub game_context: Option<String>,
    pub batch_size: usize,
    pub parallel_batches: usize,
    #[serde(with = "duration_ms")]
    pub delay_between_batches: Duration,
    pub max_retries: u32,
    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,
    #[serde(with = "duration_ms")]
    pub timeout_per_item: Duration,
}

impl BatchOptions {
    /// Options with default tuning for a language pair and provider
    pub fn new(
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        provider: TranslationProvider,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            provider,
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Reject options the orchestrator cannot run with
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(TranslationError::InvalidOptions(
                "source and target language are required".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TranslationError::InvalidOptions("batch_size must be at least 1".to_string()));
        }
        if self.parallel_batches == 0 {
            return Err(TranslationError::InvalidOptions(
                "parallel_batches must be at least 1".to_string(),
            ));
        }
        if self.timeout_per_item.is_zero() {
            return Err(TranslationError::InvalidOptions(
                "timeout_per_item must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "it".to_string(),
            provider: TranslationProvider::default(),
            api_key: String::new(),
            use_translation_memory: true,
            run_quality_checks: true,
            game_id: None,
            game_context: None,
            batch_size: 10,
            parallel_batches: 3,
            delay_between_batches: Duration::from_millis(500),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            timeout_per_item: Duration::from_secs(30),
        }
    }
}

/// A batch run and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTranslationJob {
    pub id: String,
    pub status: JobStatus,
    pub options: BatchOptions,
    pub progress: BatchProgress,
    /// One item per unit, in unit order
    pub items: Vec<TranslationItem>,
    pub results: JobResults,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchTranslationJob {
    /// New pending job for the given units
    pub fn new(options: BatchOptions, units: &[StringUnit]) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: JobStatus::Pending,
            options,
            progress: BatchProgress::new(units.len()),
            items: units.iter().map(TranslationItem::pending).collect(),
            results: JobResults {
                total_items: units.len(),
                ..Default::default()
            },
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Translated text per unit id, for serializers
    pub fn translations(&self) -> std::collections::HashMap<String, String> {
        self.items
            .iter()
            .filter(|item| item.status.is_success())
            .filter_map(|item| item.translated_text.as_ref().map(|text| (item.id.clone(), text.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itemStatus_shouldSerializeCamelCase() {
        assert_eq!(serde_json::to_string(&ItemStatus::FromMemory).unwrap(), "\"fromMemory\"");
        assert_eq!(serde_json::to_string(&JobStatus::RateLimited).unwrap(), "\"rateLimited\"");
    }

    #[test]
    fn test_progressRecompute_shouldTrackPercentage() {
        let mut progress = BatchProgress::new(4);
        progress.completed = 1;
        progress.skipped = 1;
        progress.recompute();
        assert_eq!(progress.processed(), 2);
        assert!((progress.percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_withNoUnits_shouldBeComplete() {
        let progress = BatchProgress::new(0);
        assert!((progress.percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_batchOptions_serialize_shouldOmitApiKeyAndUseMillis() {
        let options = BatchOptions::new("en", "de", TranslationProvider::DeepL, "secret-key");
        let json = serde_json::to_value(&options).unwrap();
        assert!(json.get("apiKey").is_none());
        assert_eq!(json["retryDelay"], 1000);

        let back: BatchOptions = serde_json::from_value(json).unwrap();
        assert_eq!(back.api_key, "");
        assert_eq!(back.timeout_per_item, Duration::from_secs(30));
    }

    #[test]
    fn test_batchOptions_validate_shouldRejectZeroBatchSize() {
        let options = BatchOptions {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(TranslationError::InvalidOptions(_))));
    }

    #[test]
    fn test_job_new_shouldCreatePendingItemsInOrder() {
        let units = vec![StringUnit::new("1", "menu.start", "Start", 0), StringUnit::new("2", "menu.quit", "Quit", 1)];
        let job = BatchTranslationJob::new(BatchOptions::default(), &units);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.items.len(), 2);
        assert_eq!(job.items[1].key, "menu.quit");
        assert_eq!(job.results.total_items, 2);
    }
}
