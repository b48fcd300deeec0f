/*!
 * # gamestringer
 *
 * Batch translation engine for video game text.
 *
 * ## Features
 *
 * - Translate string tables through one of several providers:
 *   - LLMs: OpenAI (and compatible APIs), Anthropic, Gemini
 *   - Machine translation: DeepL, Google Cloud Translation
 * - Translation memory in SQLite, shared by every batch, with TMX import/export
 * - Deduplication of identical source strings within a batch
 * - Rate-limit aware dispatch with exponential backoff
 * - Quality checks for placeholders, markup and length anomalies
 * - Cost estimation and content-based provider recommendation
 * - Cancellation, pause and resume from snapshots
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `providers`: Provider adapters behind one `Provider` trait
 * - `memory`: Translation memory trait and its SQLite/in-process stores
 * - `database`: SQLite connection, schema and repository
 * - `validation`: Quality checker
 * - `translation`: Batch orchestrator, cost estimator and recommendation
 * - `session`: Snapshots of interrupted batches
 * - `formats`: String file parsing and serialization
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod database;
pub mod errors;
pub mod formats;
pub mod language_utils;
pub mod memory;
pub mod providers;
pub mod session;
pub mod translation;
pub mod validation;

pub use app_config::{Config, TranslationProvider};
pub use errors::{AppError, FormatError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use memory::{InMemoryTranslationMemory, SqliteTranslationMemory, TranslationMemory};
pub use providers::{Provider, ProviderRegistry};
pub use session::{BatchSnapshot, SnapshotStore};
pub use translation::{BatchControl, BatchHooks, BatchOptions, BatchOrchestrator, BatchTranslationJob, StringUnit};
pub use validation::QualityChecker;
