/*!
 * Provider profiles and backoff timing.
 *
 * `ProviderProfile` holds the per-provider numbers used for cost and time
 * estimates and for sizing concurrency. `BackoffPolicy` computes the wait
 * before retrying after a rate limit or a transient failure.
 */

use rand::Rng;
use std::time::Duration;

use crate::app_config::{BackoffConfig, TranslationProvider};

/// Provider characteristics with tuned defaults
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    /// Price in USD per 1000 source characters
    pub price_per_1k_chars: f64,
    /// Typical latency of one request
    pub average_latency: Duration,
    /// Recommended concurrent requests
    pub max_concurrent_requests: usize,
    /// Requests per minute the default tier allows
    pub target_rpm: Option<u32>,
}

impl ProviderProfile {
    /// Get the profile for a given provider
    pub fn for_provider(provider: TranslationProvider) -> Self {
        match provider {
            TranslationProvider::OpenAI => Self {
                price_per_1k_chars: 0.002,
                average_latency: Duration::from_millis(1500),
                max_concurrent_requests: 10,
                target_rpm: Some(500),
            },
            TranslationProvider::Anthropic => Self {
                price_per_1k_chars: 0.004,
                average_latency: Duration::from_millis(2000),
                max_concurrent_requests: 5,
                target_rpm: Some(50),
            },
            TranslationProvider::Gemini => Self {
                price_per_1k_chars: 0.001,
                average_latency: Duration::from_millis(1200),
                max_concurrent_requests: 8,
                target_rpm: Some(60),
            },
            TranslationProvider::DeepSeek => Self {
                price_per_1k_chars: 0.0005,
                average_latency: Duration::from_millis(2500),
                max_concurrent_requests: 5,
                target_rpm: None,
            },
            TranslationProvider::Mistral => Self {
                price_per_1k_chars: 0.001,
                average_latency: Duration::from_millis(1500),
                max_concurrent_requests: 5,
                target_rpm: Some(60),
            },
            TranslationProvider::OpenRouter => Self {
                price_per_1k_chars: 0.002,
                average_latency: Duration::from_millis(2000),
                max_concurrent_requests: 5,
                target_rpm: Some(200),
            },
            // DeepL and Google bill per character: $20 per million
            TranslationProvider::DeepL => Self {
                price_per_1k_chars: 0.02,
                average_latency: Duration::from_millis(400),
                max_concurrent_requests: 10,
                target_rpm: Some(500),
            },
            TranslationProvider::Google => Self {
                price_per_1k_chars: 0.02,
                average_latency: Duration::from_millis(300),
                max_concurrent_requests: 10,
                target_rpm: Some(600),
            },
        }
    }

    /// Price of one request carrying `chars` source characters
    pub fn price_for_chars(&self, chars: usize) -> f64 {
        self.price_per_1k_chars * chars as f64 / 1000.0
    }

    /// Get effective concurrent requests, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override.unwrap_or(self.max_concurrent_requests).max(1)
    }
}

/// Exponential backoff with jitter
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Fraction of the delay randomly added or removed, 0.0..=1.0
    pub jitter: f64,
}

impl BackoffPolicy {
    /// Policy without jitter
    pub fn new(initial_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            multiplier,
            max_delay,
            jitter: 0.0,
        }
    }

    /// Set the jitter fraction
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `attempt` (0-based), before jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(32) as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor).min(self.max_delay.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }

    /// Delay before retry number `attempt`, with jitter applied
    ///
    /// A provider `retry_after` hint is honored as a lower bound, but the
    /// result never exceeds `max_delay`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let base = self.base_delay(attempt);
        let delay = if self.jitter > 0.0 {
            let spread = rand::rng().random_range(-self.jitter..=self.jitter);
            let millis = (base.as_millis() as f64 * (1.0 + spread)).max(0.0);
            Duration::from_millis(millis as u64).min(self.max_delay)
        } else {
            base
        };

        match retry_after {
            Some(hint) => delay.max(hint).min(self.max_delay),
            None => delay,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::from(&BackoffConfig::default())
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(config: &BackoffConfig) -> Self {
        BackoffPolicy::new(
            Duration::from_millis(config.initial_delay_ms),
            config.multiplier,
            Duration::from_millis(config.max_delay_ms),
        )
        .with_jitter(config.jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_providerProfile_forEveryProvider_shouldHavePositivePrice() {
        for provider in TranslationProvider::ALL {
            let profile = ProviderProfile::for_provider(provider);
            assert!(profile.price_per_1k_chars > 0.0, "{}", provider);
            assert!(profile.max_concurrent_requests > 0);
        }
    }

    #[test]
    fn test_priceForChars_shouldBeLinear() {
        let profile = ProviderProfile::for_provider(TranslationProvider::DeepL);
        let single = profile.price_for_chars(500);
        assert!((profile.price_for_chars(1000) - 2.0 * single).abs() < 1e-12);
        assert!((profile.price_for_chars(1000) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_effectiveConcurrentRequests_withOverride_shouldUseOverride() {
        let profile = ProviderProfile::for_provider(TranslationProvider::Anthropic);
        assert_eq!(profile.effective_concurrent_requests(Some(3)), 3);
        assert_eq!(profile.effective_concurrent_requests(None), 5);
        assert_eq!(profile.effective_concurrent_requests(Some(0)), 1);
    }

    #[test]
    fn test_baseDelay_shouldGrowAndCap() {
        let policy = BackoffPolicy::new(Duration::from_millis(2000), 2.0, Duration::from_millis(60_000));
        assert_eq!(policy.base_delay(0), Duration::from_millis(2000));
        assert_eq!(policy.base_delay(1), Duration::from_millis(4000));
        assert_eq!(policy.base_delay(3), Duration::from_millis(16_000));
        assert_eq!(policy.base_delay(10), Duration::from_millis(60_000));
    }

    #[test]
    fn test_delayFor_withJitter_shouldStayInBand() {
        let policy = BackoffPolicy::new(Duration::from_millis(1000), 2.0, Duration::from_secs(60)).with_jitter(0.1);
        for _ in 0..50 {
            let delay = policy.delay_for(0, None);
            assert!(delay >= Duration::from_millis(899) && delay <= Duration::from_millis(1100));
        }
    }

    #[test]
    fn test_delayFor_withRetryAfter_shouldHonorHint() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), 2.0, Duration::from_secs(10));
        assert_eq!(policy.delay_for(0, Some(Duration::from_secs(5))), Duration::from_secs(5));
        assert_eq!(policy.delay_for(0, Some(Duration::from_millis(10))), Duration::from_millis(100));
    }

    #[test]
    fn test_delayFor_withHugeRetryAfter_shouldCapAtMaxDelay() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), 2.0, Duration::from_secs(60));
        assert_eq!(policy.delay_for(0, Some(Duration::from_secs(86_400))), Duration::from_secs(60));
        assert_eq!(policy.delay_for(3, Some(Duration::MAX)), Duration::from_secs(60));

        let jittered = policy.clone().with_jitter(0.5);
        for attempt in 0..40 {
            assert!(jittered.delay_for(attempt, Some(Duration::from_secs(3600))) <= Duration::from_secs(60));
        }
    }

    #[test]
    fn test_fromConfig_shouldUseConfiguredValues() {
        let policy = BackoffPolicy::from(&BackoffConfig::default());
        assert_eq!(policy.initial_delay, Duration::from_millis(2000));
        assert_eq!(policy.max_delay, Duration::from_millis(60_000));
        assert!((policy.jitter - 0.1).abs() < f64::EPSILON);
    }
}
