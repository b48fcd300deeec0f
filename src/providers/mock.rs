/*!
 * Mock provider implementation for testing.
 *
 * The mock simulates the failure modes the batch orchestrator has to cope with:
 * - `MockProvider::working()` - Always succeeds with a tagged translation
 * - `MockProvider::failing(err)` - Always fails with the given error
 * - `MockProvider::rate_limited_first(n)` - Each text is rate limited `n` times, then succeeds
 * - `MockProvider::transient_first(n)` - Each text fails transiently `n` times, then succeeds
 * - `MockProvider::slow(ms)` - Succeeds after a delay
 *
 * Clones share their counters, so a test can keep a handle while the
 * orchestrator owns another.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::TranslationProvider;
use crate::errors::ProviderError;
use crate::providers::{Provider, TranslationRequest};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Always fails with the given error
    Failing(ProviderError),
    /// The first `times` calls for each text are rate limited
    RateLimitFirst { times: usize, retry_after: Option<Duration> },
    /// The first `times` calls for each text fail transiently
    TransientFirst { times: usize },
    /// Simulates slow response (for timeout and concurrency testing)
    Slow { delay_ms: u64 },
}

#[derive(Debug, Default)]
struct CallStats {
    total: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    per_text: Mutex<HashMap<String, usize>>,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Provider kind reported to the registry
    kind: TranslationProvider,
    /// Behavior mode
    behavior: MockBehavior,
    /// Texts that always fail with the paired error, regardless of behavior
    failing_texts: Arc<HashMap<String, ProviderError>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&TranslationRequest) -> String>,
    /// Shared call counters
    stats: Arc<CallStats>,
}

// Decrements the in-flight counter on every exit path, including cancellation
struct InFlightGuard<'a>(&'a CallStats);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            kind: TranslationProvider::OpenAI,
            behavior,
            failing_texts: Arc::new(HashMap::new()),
            custom_response: None,
            stats: Arc::new(CallStats::default()),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// Rate limit every text `times` times before succeeding
    pub fn rate_limited_first(times: usize) -> Self {
        Self::new(MockBehavior::RateLimitFirst { times, retry_after: None })
    }

    /// Like `rate_limited_first`, with a `Retry-After` hint on every refusal
    pub fn rate_limited_with_hint(times: usize, retry_after: Duration) -> Self {
        Self::new(MockBehavior::RateLimitFirst {
            times,
            retry_after: Some(retry_after),
        })
    }

    /// Fail every text transiently `times` times before succeeding
    pub fn transient_first(times: usize) -> Self {
        Self::new(MockBehavior::TransientFirst { times })
    }

    /// Succeed after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Report a different provider kind
    pub fn with_kind(mut self, kind: TranslationProvider) -> Self {
        self.kind = kind;
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&TranslationRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Make one specific text always fail
    pub fn with_failing_text(mut self, text: impl Into<String>, error: ProviderError) -> Self {
        let mut failing = (*self.failing_texts).clone();
        failing.insert(text.into(), error);
        self.failing_texts = Arc::new(failing);
        self
    }

    /// Total number of `translate` calls
    pub fn call_count(&self) -> usize {
        self.stats.total.load(Ordering::SeqCst)
    }

    /// Number of calls made for one text
    pub fn calls_for(&self, text: &str) -> usize {
        self.stats.per_text.lock().get(text).copied().unwrap_or(0)
    }

    /// Highest number of concurrent calls observed
    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    /// Default translation output
    pub fn default_translation(request: &TranslationRequest) -> String {
        format!("[TRANSLATED to {}] {}", request.target_language, request.text)
    }

    fn respond(&self, request: &TranslationRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => Self::default_translation(request),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> TranslationProvider {
        self.kind
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        self.stats.total.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut per_text = self.stats.per_text.lock();
            let count = per_text.entry(request.text.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let current = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.stats);

        // Let other tasks interleave so concurrency is observable
        tokio::task::yield_now().await;

        if let Some(error) = self.failing_texts.get(&request.text) {
            return Err(error.clone());
        }

        match &self.behavior {
            MockBehavior::Working => Ok(self.respond(request)),

            MockBehavior::Failing(error) => Err(error.clone()),

            MockBehavior::RateLimitFirst { times, retry_after } => {
                if attempt <= *times {
                    Err(ProviderError::RateLimited {
                        retry_after: *retry_after,
                        message: format!("Simulated rate limit (attempt {})", attempt),
                    })
                } else {
                    Ok(self.respond(request))
                }
            }

            MockBehavior::TransientFirst { times } => {
                if attempt <= *times {
                    Err(ProviderError::Transient(format!(
                        "Simulated transient failure (attempt {})",
                        attempt
                    )))
                } else {
                    Ok(self.respond(request))
                }
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(self.respond(request))
            }
        }
    }
}
