/*!
 * Integration tests for cancellation, pause and resume from snapshots.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gamestringer::app_config::TranslationProvider;
use gamestringer::errors::TranslationError;
use gamestringer::providers::mock::MockProvider;
use gamestringer::session::SnapshotStore;
use gamestringer::translation::{BatchControl, BatchHooks, BatchOptions, ItemStatus, JobStatus};

use crate::common;

fn sequential_options() -> BatchOptions {
    BatchOptions {
        batch_size: 1,
        parallel_batches: 1,
        ..common::fast_options()
    }
}

fn chapter_strings() -> Vec<String> {
    (1..=10).map(|i| format!("Chapter {} begins", i)).collect()
}

/// Hooks that cancel the run once `count` items have finished
fn cancel_after(count: usize) -> BatchHooks {
    let control = BatchControl::new();
    let finished = AtomicUsize::new(0);
    BatchHooks::new().with_control(control.clone()).on_item_complete(move |_| {
        if finished.fetch_add(1, Ordering::SeqCst) + 1 == count {
            control.cancel();
        }
    })
}

#[tokio::test]
async fn test_cancel_thenResume_shouldTranslateEveryStringExactlyOnce() {
    common::init_logging();
    let mock = MockProvider::slow(5);
    let store = SnapshotStore::new_in_memory().unwrap();
    let orchestrator = common::orchestrator_with(&mock).with_snapshot_store(store.clone());

    let strings = chapter_strings();
    let texts: Vec<&str> = strings.iter().map(String::as_str).collect();
    let units = common::units(&texts);

    let cancelled = orchestrator
        .translate_batch(&units, sequential_options(), cancel_after(3))
        .await
        .unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert_eq!(cancelled.results.translated_items, 3);
    assert!(cancelled.items[3..].iter().all(|item| item.status == ItemStatus::Pending));

    let snapshot = store
        .latest("en", "it", TranslationProvider::OpenAI)
        .await
        .unwrap()
        .expect("cancelled run should leave a snapshot");
    assert_eq!(snapshot.job_id, cancelled.id);
    assert_eq!(snapshot.completed, 3);

    let pending = snapshot.pending_units(&units);
    assert_eq!(pending.len(), 7);
    assert_eq!(pending[0].id, "u3");

    let resumed = orchestrator
        .translate_batch(&pending, sequential_options(), BatchHooks::new())
        .await
        .unwrap();
    assert_eq!(resumed.status, JobStatus::Completed);

    let mut merged: HashMap<String, String> = snapshot.translations();
    merged.extend(resumed.translations());
    assert_eq!(merged.len(), units.len());
    for text in &texts {
        assert_eq!(mock.calls_for(text), 1, "{} translated more than once", text);
    }
}

#[tokio::test]
async fn test_cancelTwice_thenResume_shouldKeepProgressOfEveryRun() {
    common::init_logging();
    let mock = MockProvider::slow(5);
    let store = SnapshotStore::new_in_memory().unwrap();
    let orchestrator = common::orchestrator_with(&mock).with_snapshot_store(store.clone());

    let strings = chapter_strings();
    let texts: Vec<&str> = strings.iter().map(String::as_str).collect();
    let units = common::units(&texts);

    let first = orchestrator
        .translate_batch(&units, sequential_options(), cancel_after(3))
        .await
        .unwrap();
    assert_eq!(first.status, JobStatus::Cancelled);

    let state = store
        .resume_state("en", "it", TranslationProvider::OpenAI)
        .await
        .unwrap()
        .unwrap();
    let second = orchestrator
        .translate_batch(&state.pending_units(&units), sequential_options(), cancel_after(3))
        .await
        .unwrap();
    assert_eq!(second.status, JobStatus::Cancelled);
    assert_eq!(second.results.translated_items, 3);

    let state = store
        .resume_state("en", "it", TranslationProvider::OpenAI)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.job_id, second.id);
    assert_eq!(state.completed, 6);
    assert_eq!(state.total, 10);
    let pending = state.pending_units(&units);
    assert_eq!(pending.len(), 4);
    assert_eq!(pending[0].id, "u6");

    let last = orchestrator
        .translate_batch(&pending, sequential_options(), BatchHooks::new())
        .await
        .unwrap();
    assert_eq!(last.status, JobStatus::Completed);

    let mut merged = state.translations();
    merged.extend(last.translations());
    assert_eq!(merged.len(), units.len());
    for text in &texts {
        assert_eq!(mock.calls_for(text), 1, "{} translated more than once", text);
    }
}

#[tokio::test]
async fn test_pause_shouldHoldDispatchUntilResumed() {
    let mock = MockProvider::working();
    let store = SnapshotStore::new_in_memory().unwrap();
    let orchestrator = common::orchestrator_with(&mock).with_snapshot_store(store.clone());
    let units = common::units(&["Save", "Load"]);

    let control = BatchControl::new();
    control.pause();

    let (job, calls_while_paused) = tokio::join!(
        orchestrator.translate_batch(&units, common::fast_options(), BatchHooks::new().with_control(control.clone())),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let calls = mock.call_count();
            control.resume();
            calls
        }
    );
    let job = job.unwrap();

    assert_eq!(calls_while_paused, 0);
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(mock.call_count(), 2);

    // The snapshot taken on pause is refreshed with the final state
    let snapshot = store.get(&job.id).await.unwrap().unwrap();
    assert!(snapshot.is_complete());
}

#[tokio::test]
async fn test_cancel_whilePaused_shouldStopWithoutCalls() {
    let mock = MockProvider::working();
    let control = BatchControl::new();
    control.pause();

    let orchestrator = common::orchestrator_with(&mock);
    let units = common::units(&["Exit"]);

    let (job, _) = tokio::join!(
        orchestrator.translate_batch(&units, common::fast_options(), BatchHooks::new().with_control(control.clone())),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            control.cancel();
        }
    );

    assert_eq!(job.unwrap().status, JobStatus::Cancelled);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_rateLimitedRun_shouldLeaveCompleteSnapshot() {
    let mock = MockProvider::rate_limited_first(1);
    let store = SnapshotStore::new_in_memory().unwrap();

    let job = common::orchestrator_with(&mock)
        .with_snapshot_store(store.clone())
        .translate_batch(&common::units(&["Retry later"]), common::fast_options(), BatchHooks::new())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    let snapshot = store.get(&job.id).await.unwrap().unwrap();
    assert!(snapshot.is_complete());
    assert!(snapshot.pending_units(&common::units(&["Retry later"])).is_empty());
}

#[tokio::test]
async fn test_missingCredentials_shouldNeverStartOrSnapshot() {
    let mock = MockProvider::working();
    let store = SnapshotStore::new_in_memory().unwrap();
    let options = BatchOptions::new("en", "it", TranslationProvider::OpenAI, "");

    let result = common::orchestrator_with(&mock)
        .with_snapshot_store(store.clone())
        .translate_batch(&common::units(&["Hello"]), options, BatchHooks::new())
        .await;

    assert!(matches!(result, Err(TranslationError::NoCredentials(_))));
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(mock.call_count(), 0);
}
