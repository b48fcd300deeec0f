use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::translation::models::BatchOptions;
use crate::validation::QualityConfig;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Translation config
    pub translation: TranslationConfig,

    /// Batch dispatch defaults
    #[serde(default)]
    pub batch: BatchConfig,

    /// Rate limit backoff settings
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Quality checker settings
    #[serde(default)]
    pub quality: QualityConfig,

    /// Translation memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI chat completions
    #[default]
    OpenAI,
    // @provider: Anthropic Claude
    Anthropic,
    // @provider: Google Gemini
    Gemini,
    // @provider: DeepSeek (OpenAI-compatible)
    DeepSeek,
    // @provider: Mistral (OpenAI-compatible)
    Mistral,
    // @provider: OpenRouter (OpenAI-compatible gateway)
    OpenRouter,
    // @provider: DeepL machine translation
    DeepL,
    // @provider: Google Cloud Translation v2
    Google,
}

impl TranslationProvider {
    /// Every supported provider, in display order
    pub const ALL: [TranslationProvider; 8] = [
        Self::OpenAI,
        Self::Anthropic,
        Self::Gemini,
        Self::DeepSeek,
        Self::Mistral,
        Self::OpenRouter,
        Self::DeepL,
        Self::Google,
    ];

    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Claude",
            Self::Gemini => "Gemini",
            Self::DeepSeek => "DeepSeek",
            Self::Mistral => "Mistral",
            Self::OpenRouter => "OpenRouter",
            Self::DeepL => "DeepL",
            Self::Google => "Google Translate",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Gemini => "gemini".to_string(),
            Self::DeepSeek => "deepseek".to_string(),
            Self::Mistral => "mistral".to_string(),
            Self::OpenRouter => "openrouter".to_string(),
            Self::DeepL => "deepl".to_string(),
            Self::Google => "google".to_string(),
        }
    }

    /// Whether the provider is a language model (prompted) rather than an MT engine
    pub fn is_llm(&self) -> bool {
        !matches!(self, Self::DeepL | Self::Google)
    }

    /// Whether the provider speaks the OpenAI chat completions protocol
    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            Self::OpenAI | Self::DeepSeek | Self::Mistral | Self::OpenRouter
        )
    }

    /// Whether a batch may only start with a non-empty API key
    pub fn requires_api_key(&self) -> bool {
        true
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            "deepseek" => Ok(Self::DeepSeek),
            "mistral" => Ok(Self::Mistral),
            "openrouter" => Ok(Self::OpenRouter),
            "deepl" => Ok(Self::DeepL),
            "google" => Ok(Self::Google),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name (ignored by MT engines)
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(provider_type),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Parse the provider type of this entry
    pub fn kind(&self) -> Result<TranslationProvider> {
        self.provider_type.parse()
    }

    /// Endpoint to use, falling back to the provider default
    pub fn effective_endpoint(&self) -> Result<String> {
        if self.endpoint.is_empty() {
            Ok(default_endpoint(self.kind()?))
        } else {
            Ok(self.endpoint.trim_end_matches('/').to_string())
        }
    }

    /// Model to use, falling back to the provider default
    pub fn effective_model(&self) -> Result<String> {
        if self.model.is_empty() {
            Ok(default_model(self.kind()?))
        } else {
            Ok(self.model.clone())
        }
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all LLM providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
        }
    }
}

/// Batch dispatch defaults, turned into `BatchOptions` for a run
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Items handled sequentially by one worker before it yields
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of batches in flight
    #[serde(default = "default_parallel_batches")]
    pub parallel_batches: usize,

    /// Pause after each batch in milliseconds
    #[serde(default = "default_delay_between_batches_ms")]
    pub delay_between_batches_ms: u64,

    /// Retries for rate limited or transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for transient retries in milliseconds, doubled on each retry
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Timeout for a single provider call in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_per_item_secs: u64,

    /// Consult and populate the translation memory
    #[serde(default = "default_true")]
    pub use_translation_memory: bool,

    /// Run the quality checker on every result
    #[serde(default = "default_true")]
    pub run_quality_checks: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            parallel_batches: default_parallel_batches(),
            delay_between_batches_ms: default_delay_between_batches_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_per_item_secs: default_timeout_secs(),
            use_translation_memory: true,
            run_quality_checks: true,
        }
    }
}

/// Exponential backoff used while the provider is rate limiting us
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackoffConfig {
    /// First wait in milliseconds
    #[serde(default = "default_backoff_initial_ms")]
    pub initial_delay_ms: u64,

    /// Growth factor applied per attempt
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,

    /// Upper bound for a single wait in milliseconds
    #[serde(default = "default_backoff_max_ms")]
    pub max_delay_ms: u64,

    /// Random spread applied to each wait (0.0 to 1.0)
    #[serde(default = "default_backoff_jitter")]
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_backoff_initial_ms(),
            multiplier: default_backoff_multiplier(),
            max_delay_ms: default_backoff_max_ms(),
            jitter: default_backoff_jitter(),
        }
    }
}

/// Translation memory storage settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MemoryConfig {
    /// Persist the memory in SQLite; a process-local memory is used otherwise
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Database file; the platform data directory is used when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: None,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the `log` crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    10
}

fn default_parallel_batches() -> usize {
    3
}

fn default_delay_between_batches_ms() -> u64 {
    500 // 500ms default delay between batches
}

fn default_max_retries() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_delay_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_backoff_initial_ms() -> u64 {
    2000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_backoff_jitter() -> f64 {
    0.1
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_endpoint(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::OpenAI => "https://api.openai.com/v1",
        TranslationProvider::Anthropic => "https://api.anthropic.com",
        TranslationProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        TranslationProvider::DeepSeek => "https://api.deepseek.com/v1",
        TranslationProvider::Mistral => "https://api.mistral.ai/v1",
        TranslationProvider::OpenRouter => "https://openrouter.ai/api/v1",
        // DeepL picks free or pro from the key; an explicit endpoint overrides it
        TranslationProvider::DeepL => "",
        TranslationProvider::Google => "https://translation.googleapis.com/language/translate/v2",
    }
    .to_string()
}

fn default_model(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::OpenAI => "gpt-4o-mini",
        TranslationProvider::Anthropic => "claude-3-5-haiku-latest",
        TranslationProvider::Gemini => "gemini-1.5-flash",
        TranslationProvider::DeepSeek => "deepseek-chat",
        TranslationProvider::Mistral => "mistral-small-latest",
        TranslationProvider::OpenRouter => "openai/gpt-4o-mini",
        TranslationProvider::DeepL | TranslationProvider::Google => "",
    }
    .to_string()
}

fn default_system_prompt() -> String {
    "You are a professional video game localizer. Translate the following text from {source_language} to {target_language}. Keep every placeholder, variable and markup tag exactly as written and reply with the translation only.".to_string()
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create config file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)
            .context("Invalid source language")?;
        crate::language_utils::validate_language_code(&self.target_language)
            .context("Invalid target language")?;

        if self.batch.batch_size == 0 {
            return Err(anyhow!("batch.batch_size must be at least 1"));
        }
        if self.batch.parallel_batches == 0 {
            return Err(anyhow!("batch.parallel_batches must be at least 1"));
        }
        if self.backoff.multiplier < 1.0 {
            return Err(anyhow!("backoff.multiplier must be at least 1.0"));
        }
        if !(0.0..=1.0).contains(&self.backoff.jitter) {
            return Err(anyhow!("backoff.jitter must be between 0.0 and 1.0"));
        }
        if self.quality.min_length_ratio >= self.quality.max_length_ratio {
            return Err(anyhow!("quality.min_length_ratio must be below quality.max_length_ratio"));
        }

        for provider_config in &self.translation.available_providers {
            provider_config.kind()?;
            if !provider_config.endpoint.is_empty() {
                url::Url::parse(&provider_config.endpoint).with_context(|| {
                    format!("Invalid endpoint for {}: {}", provider_config.provider_type, provider_config.endpoint)
                })?;
            }
        }

        let provider = self.translation.provider;
        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                provider.display_name()
            ));
        }

        Ok(())
    }

    /// Build the batch options for a run with the active provider
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            provider: self.translation.provider,
            api_key: self.translation.get_api_key(),
            use_translation_memory: self.batch.use_translation_memory,
            run_quality_checks: self.batch.run_quality_checks,
            game_id: None,
            game_context: None,
            batch_size: self.batch.batch_size,
            parallel_batches: self.batch.parallel_batches,
            delay_between_batches: Duration::from_millis(self.batch.delay_between_batches_ms),
            max_retries: self.batch.max_retries,
            retry_delay: Duration::from_millis(self.batch.retry_delay_ms),
            timeout_per_item: Duration::from_secs(self.batch.timeout_per_item_secs.max(1)),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "it".to_string(),
            translation: TranslationConfig::default(),
            batch: BatchConfig::default(),
            backoff: BackoffConfig::default(),
            quality: QualityConfig::default(),
            memory: MemoryConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get a mutable provider configuration, creating a default entry when missing
    pub fn provider_config_mut(&mut self, provider_type: TranslationProvider) -> &mut ProviderConfig {
        let provider_str = provider_type.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(provider_type));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .and_then(|p| p.effective_model().ok())
            .unwrap_or_else(|| default_model(self.provider))
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: TranslationProvider::ALL
                .iter()
                .map(|kind| ProviderConfig::new(*kind))
                .collect(),
            common: TranslationCommonConfig::default(),
        }
    }
}
