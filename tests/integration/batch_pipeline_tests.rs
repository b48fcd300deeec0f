/*!
 * Integration tests for the batch orchestrator.
 *
 * Every test runs against the scripted mock adapter; no network access.
 */

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gamestringer::errors::ProviderError;
use gamestringer::memory::InMemoryTranslationMemory;
use gamestringer::providers::mock::MockProvider;
use gamestringer::translation::{BatchHooks, BatchOptions, ItemStatus, JobStatus};
use gamestringer::validation::IssueKind;

use crate::common::{self, ProgressRecorder};

#[tokio::test]
async fn test_translateBatch_runTwiceWithMemory_shouldNotCallProviderAgain() {
    common::init_logging();
    let mock = MockProvider::working();
    let orchestrator = common::orchestrator_with(&mock).with_memory(Arc::new(InMemoryTranslationMemory::new()));
    let units = common::units(&common::rpg_strings());

    let first = orchestrator
        .translate_batch(&units, common::fast_options(), BatchHooks::new())
        .await
        .unwrap();
    let calls_after_first = mock.call_count();
    let second = orchestrator
        .translate_batch(&units, common::fast_options(), BatchHooks::new())
        .await
        .unwrap();

    assert_eq!(mock.call_count(), calls_after_first);
    assert_eq!(second.results.provider_calls, 0);
    assert_eq!(second.results.from_memory_items, units.len());
    assert_eq!(second.results.estimated_cost, 0.0);
    assert_eq!(first.translations(), second.translations());
}

#[tokio::test]
async fn test_translateBatch_progress_shouldNeverGoBackwards() {
    let mock = MockProvider::slow(2);
    let recorder = ProgressRecorder::new();
    let options = BatchOptions {
        batch_size: 3,
        parallel_batches: 3,
        ..common::fast_options()
    };
    let strings: Vec<String> = (0..20).map(|i| format!("Quest log entry number {}", i)).collect();
    let texts: Vec<&str> = strings.iter().map(String::as_str).collect();

    let job = common::orchestrator_with(&mock)
        .translate_batch(&common::units(&texts), options, recorder.hooks())
        .await
        .unwrap();

    let events = recorder.events();
    assert!(!events.is_empty());
    for pair in events.windows(2) {
        assert!(pair[1].completed >= pair[0].completed);
        assert!(pair[1].percentage >= pair[0].percentage);
    }
    for event in &events {
        assert!(event.processed() <= event.total);
    }
    let last = events.last().unwrap();
    assert_eq!(last.completed, 20);
    assert_eq!(last.percentage, 100.0);
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_translateBatch_withRepeatedStrings_shouldTranslateEachOnce() {
    let mock = MockProvider::working();
    let units = common::units(&common::rpg_strings());

    let job = common::orchestrator_with(&mock)
        .translate_batch(&units, common::fast_options(), BatchHooks::new())
        .await
        .unwrap();

    // "Continue" appears twice
    assert_eq!(mock.call_count(), units.len() - 1);
    assert_eq!(mock.calls_for("Continue"), 1);
    assert_eq!(job.items[1].translated_text, job.items[7].translated_text);
    assert_eq!(job.items[7].status, ItemStatus::Completed);
}

#[tokio::test]
async fn test_translateBatch_withTwoRateLimitsPerString_shouldRecoverWithoutLoss() {
    common::init_logging();
    let mock = MockProvider::rate_limited_first(2);
    let recorder = ProgressRecorder::new();
    let units = common::units(&["Attack", "Defend", "Use item"]);

    let job = common::orchestrator_with(&mock)
        .translate_batch(&units, common::fast_options(), recorder.hooks())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.results.translated_items, 3);
    assert_eq!(job.results.failed_items, 0);
    assert!(job.results.rate_limit_events >= 2);
    assert!(recorder.events().iter().any(|progress| progress.is_rate_limited));
    assert!(job.items.iter().all(|item| item.translated_text.is_some()));
    assert!(!job.progress.is_rate_limited);
}

#[tokio::test]
async fn test_translateBatch_withPersistentRateLimit_shouldFailAfterMaxRetries() {
    let mock = MockProvider::rate_limited_first(10);
    let options = BatchOptions {
        max_retries: 2,
        ..common::fast_options()
    };

    let job = common::orchestrator_with(&mock)
        .translate_batch(&common::units(&["Sleep"]), options, BatchHooks::new())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.items[0].attempts, 3);
    assert!(job.items[0].error.as_deref().unwrap_or_default().contains("Rate limit"));
}

#[tokio::test]
async fn test_translateBatch_shouldRespectParallelLimit() {
    let mock = MockProvider::slow(10);
    let options = BatchOptions {
        batch_size: 6,
        parallel_batches: 2,
        ..common::fast_options()
    };
    let strings: Vec<String> = (0..12).map(|i| format!("Line {}", i)).collect();
    let texts: Vec<&str> = strings.iter().map(String::as_str).collect();

    common::orchestrator_with(&mock)
        .translate_batch(&common::units(&texts), options, BatchHooks::new())
        .await
        .unwrap();

    assert!(mock.max_in_flight() <= 2);
    assert_eq!(mock.call_count(), 12);
}

#[tokio::test]
async fn test_translateBatch_withOneBadString_shouldFinishTheRest() {
    let mock = MockProvider::working().with_failing_text("Quit", ProviderError::Malformed("garbled".to_string()));
    let completed = Arc::new(Mutex::new(Vec::new()));
    let hooks = {
        let completed = completed.clone();
        BatchHooks::new().on_item_complete(move |item| completed.lock().push((item.id.clone(), item.status)))
    };

    let units = common::units(&common::rpg_strings());
    let job = common::orchestrator_with(&mock)
        .translate_batch(&units, common::fast_options(), hooks)
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.results.failed_items, 1);
    assert_eq!(job.results.translated_items, units.len() - 1);

    let completed = completed.lock();
    assert_eq!(completed.len(), units.len());
    let statuses: HashMap<&str, ItemStatus> = completed.iter().map(|(id, s)| (id.as_str(), *s)).collect();
    assert_eq!(statuses["u8"], ItemStatus::Failed);
    assert_eq!(job.items[8].attempts, 1);
}

#[tokio::test]
async fn test_translateBatch_withBrokenMarkup_shouldLowerAverageScore() {
    let mock = MockProvider::working().with_custom_response(|request| {
        if request.text.starts_with("<b>") {
            "<b>Attenzione: lo zaino è pieno".to_string()
        } else {
            format!("{} (it)", request.text)
        }
    });

    let job = common::orchestrator_with(&mock)
        .translate_batch(
            &common::units(&["<b>Warning:</b> your pack is full", "Open the door"]),
            common::fast_options(),
            BatchHooks::new(),
        )
        .await
        .unwrap();

    assert_eq!(job.items[0].quality_issues[0].kind, IssueKind::MarkupImbalance);
    assert_eq!(job.items[0].quality_score, Some(90));
    assert_eq!(job.items[1].quality_score, Some(100));
    assert_eq!(job.results.average_quality_score, Some(95.0));
}

#[tokio::test]
async fn test_translateBatch_withQualityChecksOff_shouldNotScore() {
    let mock = MockProvider::working().with_custom_response(|_| "Premi".to_string());
    let options = BatchOptions {
        run_quality_checks: false,
        ..common::fast_options()
    };

    let job = common::orchestrator_with(&mock)
        .translate_batch(&common::units(&["Press %s"]), options, BatchHooks::new())
        .await
        .unwrap();

    assert!(job.items[0].quality_issues.is_empty());
    assert_eq!(job.items[0].quality_score, None);
    assert_eq!(job.results.average_quality_score, None);
}

#[tokio::test]
async fn test_translateBatch_withInvalidOptions_shouldNotStart() {
    let mock = MockProvider::working();
    let options = BatchOptions {
        timeout_per_item: Duration::ZERO,
        ..common::fast_options()
    };

    let result = common::orchestrator_with(&mock)
        .translate_batch(&common::units(&["Hi"]), options, BatchHooks::new())
        .await;

    assert!(result.is_err());
    assert_eq!(mock.call_count(), 0);
}
