/*!
 * Cost and duration estimates for a batch, before any provider call.
 */

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::concurrency::ProviderProfile;
use crate::app_config::TranslationProvider;

/// Inputs of an estimate besides the strings themselves
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateOptions {
    pub provider: TranslationProvider,
    pub use_translation_memory: bool,
    /// Expected share of strings served by the memory, 0.0..=1.0
    pub tm_hit_rate: f64,
    pub parallel_batches: usize,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            use_translation_memory: true,
            tm_hit_rate: 0.0,
            parallel_batches: 3,
        }
    }
}

/// Split between memory hits and provider calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub estimated_tm_hits: usize,
    pub estimated_api_calls: usize,
}

/// Estimated cost (USD) and wall time of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub estimated_cost: f64,
    #[serde(with = "super::models::duration_ms")]
    pub estimated_time: Duration,
    pub breakdown: CostBreakdown,
}

/// Price of one provider call with `chars` characters
pub fn call_cost(provider: TranslationProvider, chars: usize) -> f64 {
    ProviderProfile::for_provider(provider).price_for_chars(chars)
}

/// Estimate cost and duration of translating `strings`
pub fn estimate<S: AsRef<str>>(strings: &[S], options: &EstimateOptions) -> CostEstimate {
    let total = strings.len();
    if total == 0 {
        return CostEstimate {
            estimated_cost: 0.0,
            estimated_time: Duration::ZERO,
            breakdown: CostBreakdown {
                estimated_tm_hits: 0,
                estimated_api_calls: 0,
            },
        };
    }

    let api_calls = if options.use_translation_memory {
        let hit_rate = options.tm_hit_rate.clamp(0.0, 1.0);
        ((total as f64) * (1.0 - hit_rate)).round() as usize
    } else {
        total
    };
    let tm_hits = total - api_calls.min(total);

    let total_chars: usize = strings.iter().map(|s| s.as_ref().chars().count()).sum();
    let avg_chars = total_chars as f64 / total as f64;

    let profile = ProviderProfile::for_provider(options.provider);
    let estimated_cost = api_calls as f64 * profile.price_per_1k_chars * avg_chars / 1000.0;

    let parallel = options.parallel_batches.max(1) as u32;
    let estimated_time = profile.average_latency * api_calls as u32 / parallel;

    CostEstimate {
        estimated_cost,
        estimated_time,
        breakdown: CostBreakdown {
            estimated_tm_hits: tm_hits,
            estimated_api_calls: api_calls,
        },
    }
}
