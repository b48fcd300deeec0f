/*!
 * Batch translation orchestrator.
 *
 * Runs a list of `StringUnit`s through one provider:
 * - units with the same normalized source are translated once and the result
 *   is fanned out to every unit sharing it
 * - the translation memory is consulted first; hits never reach the provider
 * - misses are dispatched in chunks of `batch_size`, with up to
 *   `parallel_batches` requests in flight, on the current task
 * - rate limits close a shared gate so no worker calls the provider until the
 *   backoff elapses; transient failures are retried per item
 * - progress and item callbacks fire under one lock after every transition
 *
 * Cancellation and pause are cooperative and checked before each dispatch.
 * In-flight calls finish; a snapshot is written so the run can be resumed.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::concurrency::BackoffPolicy;
use super::cost::call_cost;
use super::models::{
    BatchOptions, BatchProgress, BatchTranslationJob, ItemStatus, JobStatus, StringUnit, TranslationItem,
};
use crate::errors::{ProviderError, TranslationError};
use crate::memory::{normalize_source, truncate_text, MemoryKey, TranslationMemory, TranslationMemoryEntry};
use crate::providers::{Provider, ProviderRegistry, TranslationRequest};
use crate::session::{BatchSnapshot, SnapshotStore};
use crate::validation::{QualityChecker, QualityIssue};

/// Called with the current progress after every transition
pub type ProgressCallback = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

/// Called with an item once it reaches a terminal state
pub type ItemCallback = Arc<dyn Fn(&TranslationItem) + Send + Sync>;

#[derive(Debug, Default)]
struct ControlState {
    cancelled: AtomicBool,
    paused: AtomicBool,
    changed: Notify,
}

/// Cooperative cancel and pause switch shared with a running batch
#[derive(Debug, Clone, Default)]
pub struct BatchControl {
    state: Arc<ControlState>,
}

impl BatchControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop dispatching; in-flight calls finish
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.changed.notify_waiters();
    }

    /// Hold dispatch until `resume`
    pub fn pause(&self) {
        self.state.paused.store(true, Ordering::SeqCst);
        self.state.changed.notify_waiters();
    }

    pub fn resume(&self) {
        self.state.paused.store(false, Ordering::SeqCst);
        self.state.changed.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }

    /// Resolve once the batch is cancelled
    pub async fn cancelled(&self) {
        loop {
            // Register before checking so a concurrent cancel is not missed
            let notified = self.state.changed.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Wait while paused; returns false when cancelled
    pub async fn wait_if_paused(&self) -> bool {
        loop {
            let notified = self.state.changed.notified();
            if self.is_cancelled() {
                return false;
            }
            if !self.is_paused() {
                return true;
            }
            notified.await;
        }
    }
}

/// Callbacks and control for one run
#[derive(Clone, Default)]
pub struct BatchHooks {
    on_progress: Option<ProgressCallback>,
    on_item_complete: Option<ItemCallback>,
    control: BatchControl,
}

impl BatchHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, callback: impl Fn(&BatchProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_item_complete(mut self, callback: impl Fn(&TranslationItem) + Send + Sync + 'static) -> Self {
        self.on_item_complete = Some(Arc::new(callback));
        self
    }

    pub fn with_control(mut self, control: BatchControl) -> Self {
        self.control = control;
        self
    }

    pub fn control(&self) -> &BatchControl {
        &self.control
    }
}

impl std::fmt::Debug for BatchHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchHooks")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_item_complete", &self.on_item_complete.is_some())
            .field("control", &self.control)
            .finish()
    }
}

/// Shared deadline before which no provider call may start
#[derive(Debug, Default)]
struct RateLimitGate {
    until: Mutex<Option<Instant>>,
}

impl RateLimitGate {
    /// Extend the gate to `deadline`; an earlier deadline never shortens it
    fn hold_until(&self, deadline: Instant) {
        let mut until = self.until.lock();
        if until.is_none_or(|current| current < deadline) {
            *until = Some(deadline);
        }
    }

    fn is_closed(&self) -> bool {
        self.until.lock().is_some_and(|deadline| deadline > Instant::now())
    }

    /// Wait for the gate to open; returns whether any waiting happened
    async fn wait(&self, control: &BatchControl) -> bool {
        let mut waited = false;
        loop {
            let deadline = *self.until.lock();
            match deadline {
                Some(deadline) if deadline > Instant::now() => {
                    waited = true;
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {}
                        _ = control.cancelled() => return waited,
                    }
                }
                _ => return waited,
            }
        }
    }
}

/// Sleep for `delay`; returns false when cancelled first
async fn sleep_unless_cancelled(control: &BatchControl, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = control.cancelled() => false,
    }
}

/// Units sharing one normalized source text
#[derive(Debug)]
struct UniqueText {
    /// Trimmed source of the first unit, sent to the provider
    text: String,
    indices: Vec<usize>,
}

/// Group units by normalized source; blank units are returned separately
fn group_units(units: &[StringUnit]) -> (Vec<UniqueText>, Vec<usize>) {
    let mut groups: Vec<UniqueText> = Vec::new();
    let mut by_text: HashMap<String, usize> = HashMap::new();
    let mut blank = Vec::new();

    for (index, unit) in units.iter().enumerate() {
        let normalized = normalize_source(&unit.source_text);
        if normalized.is_empty() {
            blank.push(index);
            continue;
        }
        match by_text.get(&normalized) {
            Some(&group) => groups[group].indices.push(index),
            None => {
                by_text.insert(normalized, groups.len());
                groups.push(UniqueText {
                    text: unit.source_text.trim().to_string(),
                    indices: vec![index],
                });
            }
        }
    }

    (groups, blank)
}

/// Keep the leading and trailing whitespace of the source around a translation
fn with_source_padding(source: &str, translated: &str) -> String {
    let trimmed_start = source.trim_start();
    let leading = &source[..source.len() - trimmed_start.len()];
    let trailing = &trimmed_start[trimmed_start.trim_end().len()..];
    format!("{}{}{}", leading, translated.trim(), trailing)
}

/// Final state applied to every unit of a group
#[derive(Debug)]
struct ItemResult {
    status: ItemStatus,
    text: Option<String>,
    issues: Vec<QualityIssue>,
    score: Option<u32>,
    error: Option<String>,
    attempts: u32,
}

impl ItemResult {
    fn new(status: ItemStatus) -> Self {
        Self {
            status,
            text: None,
            issues: Vec::new(),
            score: None,
            error: None,
            attempts: 0,
        }
    }
}

/// How a group's dispatch loop ended
#[derive(Debug)]
enum Dispatch {
    Translated(String),
    Failed(ProviderError),
    /// Cancelled before a result; the units stay pending
    Interrupted,
}

#[derive(Debug)]
struct RunState {
    job: BatchTranslationJob,
    scores: Vec<u32>,
    cost: f64,
    snapshot_written: bool,
}

/// Mutable state of one `translate_batch` call
struct Run<'a> {
    state: Mutex<RunState>,
    hooks: &'a BatchHooks,
    gate: RateLimitGate,
}

impl<'a> Run<'a> {
    fn new(job: BatchTranslationJob, hooks: &'a BatchHooks) -> Self {
        Self {
            state: Mutex::new(RunState {
                job,
                scores: Vec::new(),
                cost: 0.0,
                snapshot_written: false,
            }),
            hooks,
            gate: RateLimitGate::default(),
        }
    }

    fn control(&self) -> &BatchControl {
        &self.hooks.control
    }

    fn emit_progress(&self, state: &RunState) {
        if let Some(callback) = &self.hooks.on_progress {
            callback(&state.job.progress);
        }
    }

    fn set_status(&self, status: JobStatus, message: Option<String>) {
        let mut state = self.state.lock();
        state.job.status = status;
        state.job.progress.status_message = message;
        self.emit_progress(&state);
    }

    fn record_call(&self, provider: crate::app_config::TranslationProvider, chars: usize) {
        let mut state = self.state.lock();
        state.job.results.provider_calls += 1;
        state.cost += call_cost(provider, chars);
    }

    fn mark_translating(&self, indices: &[usize]) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        for &index in indices {
            state.job.items[index].status = ItemStatus::Translating;
        }
        let current = indices.first().map(|&i| state.job.items[i].source_text.clone());
        state.job.progress.current_item = current;
    }

    /// Apply a result to every unit of a group, emitting callbacks per unit
    fn finish_group(&self, indices: &[usize], result: ItemResult) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        for &index in indices {
            {
                let item = &mut state.job.items[index];
                item.status = result.status;
                item.from_memory = result.status == ItemStatus::FromMemory;
                item.translated_text = result.text.as_deref().map(|text| with_source_padding(&item.source_text, text));
                item.quality_issues = result.issues.clone();
                item.quality_score = result.score;
                item.error = result.error.clone();
                item.attempts = result.attempts;
            }

            let progress = &mut state.job.progress;
            match result.status {
                ItemStatus::Completed => progress.completed += 1,
                ItemStatus::FromMemory => {
                    progress.completed += 1;
                    progress.from_memory += 1;
                }
                ItemStatus::Failed => progress.failed += 1,
                ItemStatus::Skipped => progress.skipped += 1,
                ItemStatus::Pending | ItemStatus::Translating => {}
            }
            progress.current_item = Some(state.job.items[index].source_text.clone());
            progress.recompute();

            if let Some(score) = result.score {
                state.scores.push(score);
            }
            state.job.results.quality_issues.extend(result.issues.iter().cloned());

            self.emit_progress(state);
            if result.status.is_terminal() {
                if let Some(callback) = &self.hooks.on_item_complete {
                    callback(&state.job.items[index]);
                }
            }
        }
    }

    /// Close the gate and switch to `rateLimited`; returns a snapshot to persist
    /// when the job just entered that state
    fn enter_rate_limited(&self, deadline: Instant, message: String) -> Option<BatchSnapshot> {
        self.gate.hold_until(deadline);

        let mut state = self.state.lock();
        state.job.results.rate_limit_events += 1;
        state.job.progress.is_rate_limited = true;
        state.job.progress.status_message = Some(message);

        let entered = state.job.status == JobStatus::Running;
        if entered {
            state.job.status = JobStatus::RateLimited;
            state.snapshot_written = true;
        }
        self.emit_progress(&state);

        entered.then(|| BatchSnapshot::from_job(&state.job))
    }

    fn leave_rate_limited(&self) {
        if self.gate.is_closed() {
            return;
        }
        let mut state = self.state.lock();
        if state.job.status == JobStatus::RateLimited {
            state.job.status = JobStatus::Running;
            state.job.progress.is_rate_limited = false;
            state.job.progress.status_message = None;
            self.emit_progress(&state);
        }
    }

    fn enter_paused(&self) -> Option<BatchSnapshot> {
        let mut state = self.state.lock();
        if state.job.status == JobStatus::Paused {
            return None;
        }
        state.job.status = JobStatus::Paused;
        state.job.progress.status_message = Some("Paused".to_string());
        state.snapshot_written = true;
        self.emit_progress(&state);
        Some(BatchSnapshot::from_job(&state.job))
    }

    fn leave_paused(&self) {
        let mut state = self.state.lock();
        if state.job.status == JobStatus::Paused {
            state.job.status = if self.gate.is_closed() {
                JobStatus::RateLimited
            } else {
                JobStatus::Running
            };
            state.job.progress.status_message = None;
            self.emit_progress(&state);
        }
    }

    /// Settle the final status and results
    fn finish(self, cancelled: bool) -> (BatchTranslationJob, bool) {
        let RunState {
            mut job,
            scores,
            cost,
            snapshot_written,
        } = self.state.into_inner();

        let progress = &mut job.progress;
        progress.is_rate_limited = false;
        progress.recompute();

        job.status = if cancelled {
            JobStatus::Cancelled
        } else if job.results.provider_calls > 0 && progress.completed == 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        progress.status_message = Some(format!("Batch {}", job.status));

        let results = &mut job.results;
        results.translated_items = progress.completed;
        results.failed_items = progress.failed;
        results.skipped_items = progress.skipped;
        results.from_memory_items = progress.from_memory;
        results.estimated_cost = cost;
        results.average_quality_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64)
        };

        job.finished_at = Some(chrono::Utc::now());
        if let Some(callback) = &self.hooks.on_progress {
            callback(&job.progress);
        }

        (job, snapshot_written)
    }
}

/// Runs batches of units through a provider with memory, retries and checks
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    registry: ProviderRegistry,
    memory: Option<Arc<dyn TranslationMemory>>,
    snapshots: Option<SnapshotStore>,
    checker: QualityChecker,
    backoff: BackoffPolicy,
}

impl BatchOrchestrator {
    /// Orchestrator without memory or snapshot persistence
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            memory: None,
            snapshots: None,
            checker: QualityChecker::new(),
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn TranslationMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_snapshot_store(mut self, store: SnapshotStore) -> Self {
        self.snapshots = Some(store);
        self
    }

    pub fn with_quality_checker(mut self, checker: QualityChecker) -> Self {
        self.checker = checker;
        self
    }

    /// Backoff used while rate limited
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Translate `units` and return the finished job
    ///
    /// Fails only when the job cannot start: invalid options, an unregistered
    /// provider or missing credentials. Item failures are reported in the job.
    pub async fn translate_batch(
        &self,
        units: &[StringUnit],
        options: BatchOptions,
        hooks: BatchHooks,
    ) -> Result<BatchTranslationJob, TranslationError> {
        options.validate()?;
        let adapter = self
            .registry
            .get(options.provider)
            .ok_or_else(|| TranslationError::UnknownProvider(options.provider.to_string()))?;
        if options.provider.requires_api_key() && options.api_key.trim().is_empty() {
            return Err(TranslationError::NoCredentials(options.provider.display_name().to_string()));
        }

        let (groups, blank) = group_units(units);
        let run = Run::new(BatchTranslationJob::new(options.clone(), units), &hooks);
        let job_id = run.state.lock().job.id.clone();

        info!(
            "Starting batch {}: {} strings ({} unique) {} -> {} with {}",
            job_id,
            units.len(),
            groups.len(),
            options.source_language,
            options.target_language,
            options.provider.display_name()
        );
        run.set_status(JobStatus::Running, None);

        if !blank.is_empty() {
            run.finish_group(&blank, ItemResult::new(ItemStatus::Skipped));
        }

        let mut misses = Vec::new();
        for group in groups {
            match self.lookup_memory(&options, &group.text).await {
                Some(entry) => self.apply_memory_hit(&run, &options, &group, entry).await,
                None => misses.push(group),
            }
        }

        let chunk_count = misses.len().div_ceil(options.batch_size);
        for (chunk_index, chunk) in misses.chunks(options.batch_size).enumerate() {
            if !self.wait_for_dispatch(&run).await {
                break;
            }
            debug!(
                "Dispatching chunk {}/{} ({} strings)",
                chunk_index + 1,
                chunk_count,
                chunk.len()
            );

            stream::iter(chunk.iter())
                .map(|group| self.process_group(&run, group, adapter.as_ref(), &options))
                .buffer_unordered(options.parallel_batches)
                .collect::<Vec<()>>()
                .await;

            let is_last = chunk_index + 1 == chunk_count;
            if !is_last
                && !options.delay_between_batches.is_zero()
                && !sleep_unless_cancelled(run.control(), options.delay_between_batches).await
            {
                break;
            }
        }

        let cancelled = run.control().is_cancelled();
        let (job, snapshot_written) = run.finish(cancelled);

        if cancelled || snapshot_written {
            self.save_snapshot(BatchSnapshot::from_job(&job)).await;
        }

        info!(
            "Batch {} {}: {} translated ({} from memory), {} failed, {} skipped, {} provider calls, ${:.4}",
            job.id,
            job.status,
            job.results.translated_items,
            job.results.from_memory_items,
            job.results.failed_items,
            job.results.skipped_items,
            job.results.provider_calls,
            job.results.estimated_cost
        );

        Ok(job)
    }

    async fn lookup_memory(&self, options: &BatchOptions, text: &str) -> Option<TranslationMemoryEntry> {
        if !options.use_translation_memory {
            return None;
        }
        let memory = self.memory.as_ref()?;
        let key = MemoryKey::new(
            text,
            &options.source_language,
            &options.target_language,
            options.game_context.as_deref(),
        );

        match memory.lookup(&key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Translation memory lookup failed, treating as miss: {}", e);
                None
            }
        }
    }

    async fn apply_memory_hit(&self, run: &Run<'_>, options: &BatchOptions, group: &UniqueText, entry: TranslationMemoryEntry) {
        debug!("Memory hit for '{}'", truncate_text(&group.text, 40));
        if let Some(memory) = &self.memory {
            if let Err(e) = memory.record_hit(&entry.key()).await {
                warn!("Failed to record memory hit: {}", e);
            }
        }

        let mut result = ItemResult::new(ItemStatus::FromMemory);
        if options.run_quality_checks {
            let (issues, score) = self.checker.assess(&group.text, &entry.translated_text);
            result.issues = issues;
            result.score = Some(score);
        }
        result.text = Some(entry.translated_text);
        run.finish_group(&group.indices, result);
    }

    async fn remember(&self, options: &BatchOptions, source: &str, translated: &str) {
        if !options.use_translation_memory {
            return;
        }
        let Some(memory) = &self.memory else {
            return;
        };

        let entry = TranslationMemoryEntry::new(
            source,
            &options.source_language,
            &options.target_language,
            translated.trim(),
            options.provider.to_string(),
        )
        .with_game_context(options.game_context.as_deref())
        .with_game_id(options.game_id.as_deref());

        if let Err(e) = memory.insert(entry).await {
            warn!("Failed to store translation in memory: {}", e);
        }
    }

    async fn save_snapshot(&self, snapshot: BatchSnapshot) {
        if let Some(store) = &self.snapshots {
            if let Err(e) = store.save(&snapshot).await {
                warn!("Failed to save batch snapshot: {}", e);
            }
        }
    }

    /// Honor pause and cancellation before a dispatch; false means stop
    async fn wait_for_dispatch(&self, run: &Run<'_>) -> bool {
        let control = run.control();
        if control.is_cancelled() {
            return false;
        }
        if control.is_paused() {
            if let Some(snapshot) = run.enter_paused() {
                info!("Batch paused");
                self.save_snapshot(snapshot).await;
            }
            let resumed = control.wait_if_paused().await;
            run.leave_paused();
            if !resumed {
                return false;
            }
            info!("Batch resumed");
        }
        true
    }

    async fn process_group(&self, run: &Run<'_>, group: &UniqueText, adapter: &dyn Provider, options: &BatchOptions) {
        if !self.wait_for_dispatch(run).await {
            return;
        }
        run.mark_translating(&group.indices);

        let request = TranslationRequest::new(
            group.text.clone(),
            options.source_language.clone(),
            options.target_language.clone(),
            options.api_key.clone(),
        )
        .with_context(options.game_context.clone());
        let chars = group.text.chars().count();

        let mut attempts = 0u32;
        let mut rate_limit_retries = 0u32;
        let mut transient_retries = 0u32;

        let dispatch = loop {
            if run.gate.wait(run.control()).await {
                run.leave_rate_limited();
            }
            if run.control().is_cancelled() {
                break Dispatch::Interrupted;
            }

            attempts += 1;
            run.record_call(options.provider, chars);
            debug!("Translating '{}' (attempt {})", truncate_text(&group.text, 40), attempts);

            let result = match tokio::time::timeout(options.timeout_per_item, adapter.translate(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Transient(format!(
                    "Request timed out after {:.1}s",
                    options.timeout_per_item.as_secs_f64()
                ))),
            };

            let failure = match result {
                Ok(text) if !text.trim().is_empty() => break Dispatch::Translated(text),
                Ok(_) => ProviderError::Malformed("Provider returned an empty translation".to_string()),
                Err(e) => e,
            };

            match &failure {
                ProviderError::RateLimited { retry_after, message } if rate_limit_retries < options.max_retries => {
                    let delay = self.backoff.delay_for(rate_limit_retries, *retry_after);
                    rate_limit_retries += 1;
                    let status = format!(
                        "Rate limited by {}, retrying in {:.1}s ({}/{})",
                        options.provider.display_name(),
                        delay.as_secs_f64(),
                        rate_limit_retries,
                        options.max_retries
                    );
                    warn!("{}: {}", status, message);
                    let now = Instant::now();
                    let deadline = now
                        .checked_add(delay)
                        .or_else(|| now.checked_add(self.backoff.max_delay))
                        .unwrap_or(now);
                    if let Some(snapshot) = run.enter_rate_limited(deadline, status) {
                        self.save_snapshot(snapshot).await;
                    }
                }
                ProviderError::Transient(message) if transient_retries < options.max_retries => {
                    let delay = options.retry_delay.saturating_mul(2u32.pow(transient_retries.min(16)));
                    transient_retries += 1;
                    warn!(
                        "Transient failure for '{}', retry {}/{} in {:.1}s: {}",
                        truncate_text(&group.text, 40),
                        transient_retries,
                        options.max_retries,
                        delay.as_secs_f64(),
                        message
                    );
                    if !sleep_unless_cancelled(run.control(), delay).await {
                        break Dispatch::Interrupted;
                    }
                }
                _ => break Dispatch::Failed(failure.clone()),
            }

            if !self.wait_for_dispatch(run).await {
                break Dispatch::Interrupted;
            }
        };

        match dispatch {
            Dispatch::Translated(text) => {
                let mut result = ItemResult::new(ItemStatus::Completed);
                if options.run_quality_checks {
                    let (issues, score) = self.checker.assess(&group.text, &text);
                    result.issues = issues;
                    result.score = Some(score);
                }
                self.remember(options, &group.text, &text).await;
                result.text = Some(text);
                result.attempts = attempts;
                run.finish_group(&group.indices, result);
            }
            Dispatch::Failed(e) => {
                error!(
                    "Translation failed for '{}' after {} attempt(s): {}",
                    truncate_text(&group.text, 40),
                    attempts,
                    e
                );
                let mut result = ItemResult::new(ItemStatus::Failed);
                result.error = Some(e.to_string());
                result.attempts = attempts;
                run.finish_group(&group.indices, result);
            }
            Dispatch::Interrupted => {
                let mut result = ItemResult::new(ItemStatus::Pending);
                result.attempts = attempts;
                run.finish_group(&group.indices, result);
            }
        }
    }
}
