/*!
 * Batch translation of game strings.
 *
 * - `models`: units, items, progress, options and the job record
 * - `batch`: `BatchOrchestrator`, the memory/provider/retry pipeline
 * - `concurrency`: provider profiles and rate-limit backoff
 * - `cost`: pre-flight cost and time estimates
 * - `recommend`: content-based provider recommendation
 */

pub use self::batch::{BatchControl, BatchHooks, BatchOrchestrator, ItemCallback, ProgressCallback};
pub use self::concurrency::{BackoffPolicy, ProviderProfile};
pub use self::cost::{estimate, CostBreakdown, CostEstimate, EstimateOptions};
pub use self::models::{
    BatchOptions, BatchProgress, BatchTranslationJob, ItemStatus, JobResults, JobStatus, StringUnit,
    TranslationItem,
};
pub use self::recommend::{recommend, recommend_provider, ContentFeatures, Recommendation};

pub mod batch;
pub mod concurrency;
pub mod cost;
pub mod models;
pub mod recommend;
