/*!
 * Common test utilities for the gamestringer test suite
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use gamestringer::app_config::TranslationProvider;
use gamestringer::providers::mock::MockProvider;
use gamestringer::providers::ProviderRegistry;
use gamestringer::translation::{BackoffPolicy, BatchHooks, BatchOptions, BatchOrchestrator, BatchProgress, StringUnit};

/// Install a test logger once; later calls are no-ops
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    std::fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Units with sequential IDs `u0`, `u1`, ...
pub fn units(texts: &[&str]) -> Vec<StringUnit> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| StringUnit::new(format!("u{}", i), format!("strings.{}", i), *text, i))
        .collect()
}

/// Sample UI and dialogue strings from a small RPG
pub fn rpg_strings() -> Vec<&'static str> {
    vec![
        "New Game",
        "Continue",
        "Options",
        "You found {0} gold coins!",
        "Press %s to open the inventory",
        "<b>Warning:</b> your pack is full",
        "The old bridge collapsed behind you.",
        "Continue",
        "Quit",
        "Welcome back, {player_name}.",
    ]
}

/// Options with a key and no artificial delays
pub fn fast_options() -> BatchOptions {
    BatchOptions {
        delay_between_batches: Duration::ZERO,
        retry_delay: Duration::from_millis(1),
        ..BatchOptions::new("en", "it", TranslationProvider::OpenAI, "test-key")
    }
}

/// Orchestrator over a single mock adapter with millisecond backoff
pub fn orchestrator_with(mock: &MockProvider) -> BatchOrchestrator {
    BatchOrchestrator::new(ProviderRegistry::new().with(Arc::new(mock.clone()))).with_backoff(BackoffPolicy::new(
        Duration::from_millis(5),
        2.0,
        Duration::from_millis(40),
    ))
}

/// Every progress value reported during a run
#[derive(Clone, Default)]
pub struct ProgressRecorder {
    events: Arc<Mutex<Vec<BatchProgress>>>,
}

impl ProgressRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks that record into this recorder
    pub fn hooks(&self) -> BatchHooks {
        let events = self.events.clone();
        BatchHooks::new().on_progress(move |progress| events.lock().push(progress.clone()))
    }

    pub fn events(&self) -> Vec<BatchProgress> {
        self.events.lock().clone()
    }
}
