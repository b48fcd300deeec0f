/*!
 * Provider implementations for different translation services.
 *
 * Every backend implements the same [`Provider`] trait: one source string in,
 * one translated string out. Adapters own authentication, request shaping and
 * the mapping of HTTP failures onto [`ProviderError`]:
 * - `openai`: OpenAI chat completions, also used for DeepSeek, Mistral and OpenRouter
 * - `anthropic`: Anthropic messages API
 * - `gemini`: Google Gemini generateContent
 * - `deepl`: DeepL v2 translate
 * - `google`: Google Cloud Translation v2
 * - `mock`: scriptable adapter for tests
 *
 * The [`ProviderRegistry`] maps a provider kind to its adapter.
 */

use async_trait::async_trait;
use log::{error, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{ProviderConfig, TranslationCommonConfig, TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils::display_language;

/// A single translation request handed to an adapter
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// Source text, sent as-is
    pub text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Opaque credential for the provider
    pub api_key: String,
    /// Optional game description appended to LLM prompts
    pub context: Option<String>,
}

impl TranslationRequest {
    /// Create a request without game context
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            api_key: api_key.into(),
            context: None,
        }
    }

    /// Attach a game context
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context.filter(|c| !c.trim().is_empty());
        self
    }
}

/// Common trait for all translation providers
///
/// Adapters hold no shared mutable state, so one instance may serve many
/// concurrent requests.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Which provider this adapter talks to
    fn kind(&self) -> TranslationProvider;

    /// Translate a single string
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or a tagged failure
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError>;
}

/// Strategy table from provider kind to adapter
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<TranslationProvider, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding an HTTP adapter for every supported provider
    pub fn from_config(config: &TranslationConfig) -> Self {
        let mut registry = Self::new();
        for kind in TranslationProvider::ALL {
            let provider_config = config
                .get_provider_config(&kind)
                .cloned()
                .unwrap_or_else(|| ProviderConfig::new(kind));
            registry.register(build_adapter(kind, &provider_config, &config.common));
        }
        registry
    }

    /// Register an adapter, replacing any previous one for the same kind
    pub fn register(&mut self, adapter: Arc<dyn Provider>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    /// Builder-style registration
    pub fn with(mut self, adapter: Arc<dyn Provider>) -> Self {
        self.register(adapter);
        self
    }

    /// Look up the adapter for a provider
    pub fn get(&self, kind: TranslationProvider) -> Option<Arc<dyn Provider>> {
        self.adapters.get(&kind).cloned()
    }

    /// Whether an adapter is registered for the provider
    pub fn contains(&self, kind: TranslationProvider) -> bool {
        self.adapters.contains_key(&kind)
    }

    /// Registered provider kinds
    pub fn kinds(&self) -> Vec<TranslationProvider> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort_by_key(|k| k.to_lowercase_string());
        kinds
    }
}

/// Build the HTTP adapter for a provider
pub fn build_adapter(
    kind: TranslationProvider,
    config: &ProviderConfig,
    common: &TranslationCommonConfig,
) -> Arc<dyn Provider> {
    match kind {
        TranslationProvider::Anthropic => Arc::new(anthropic::Anthropic::new(config, common)),
        TranslationProvider::Gemini => Arc::new(gemini::Gemini::new(config, common)),
        TranslationProvider::DeepL => Arc::new(deepl::DeepL::new(config)),
        TranslationProvider::Google => Arc::new(google::GoogleTranslate::new(config)),
        TranslationProvider::OpenAI
        | TranslationProvider::DeepSeek
        | TranslationProvider::Mistral
        | TranslationProvider::OpenRouter => Arc::new(openai::OpenAI::new(kind, config, common)),
    }
}

/// HTTP client with the configured timeout
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Longest `Retry-After` hint taken from a server
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Parse a `Retry-After` header in its delay-seconds form
///
/// Values too large to represent, or above [`MAX_RETRY_AFTER`], are clamped
/// to it. HTTP-date values are not supported and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    let delay = match value.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => {
            let secs = value.parse::<f64>().ok().filter(|secs| *secs >= 0.0)?;
            Duration::try_from_secs_f64(secs).unwrap_or(MAX_RETRY_AFTER)
        }
    };
    Some(delay.min(MAX_RETRY_AFTER))
}

/// Map a non-success HTTP status onto a provider error
pub fn error_for_status(status: u16, retry_after: Option<Duration>, body: &str) -> ProviderError {
    let message = format!("HTTP {}: {}", status, truncate_body(body));
    match status {
        429 => ProviderError::RateLimited { retry_after, message },
        401 | 403 => ProviderError::AuthFailed(message),
        408 | 500..=599 => ProviderError::Transient(message),
        _ => ProviderError::Malformed(message),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX_BODY_CHARS: usize = 300;
    let body = body.trim();
    if body.chars().count() <= MAX_BODY_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_BODY_CHARS).collect();
        format!("{}...", cut)
    }
}

/// Send a request and decode the JSON body, mapping failures onto `ProviderError`
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider_name: &str,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        let err = error_for_status(status.as_u16(), retry_after, &body);
        match err {
            ProviderError::RateLimited { .. } => warn!("{} API rate limited ({})", provider_name, status),
            _ => error!("{} API error ({}): {}", provider_name, status, truncate_body(&body)),
        }
        return Err(err);
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(ProviderError::Malformed(format!("{} returned an empty body", provider_name)));
    }
    serde_json::from_str(&body).map_err(|e| {
        ProviderError::Malformed(format!("Failed to parse {} API response: {}", provider_name, e))
    })
}

/// Build the system prompt for an LLM adapter
pub fn build_system_prompt(template: &str, request: &TranslationRequest) -> String {
    let mut prompt = template
        .replace("{source_language}", &display_language(&request.source_language))
        .replace("{target_language}", &display_language(&request.target_language));

    if let Some(context) = &request.context {
        prompt.push_str("\n\nGame context: ");
        prompt.push_str(context.trim());
    }

    prompt
}

static CODE_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\n?```$").unwrap()
});

/// Strip the wrappers LLMs like to put around a bare translation
pub fn clean_model_reply(reply: &str) -> String {
    let mut text = reply.trim();

    if let Some(captures) = CODE_FENCE_REGEX.captures(text) {
        if let Some(inner) = captures.get(1) {
            text = inner.as_str().trim();
        }
    }

    for (open, close) in [("\"", "\""), ("“", "”"), ("«", "»"), ("'", "'")] {
        if text.len() >= open.len() + close.len() && text.starts_with(open) && text.ends_with(close) {
            let inner = &text[open.len()..text.len() - close.len()];
            if !inner.contains(open) {
                text = inner.trim();
                break;
            }
        }
    }

    text.to_string()
}

pub mod anthropic;
pub mod deepl;
pub mod gemini;
pub mod google;
pub mod mock;
pub mod openai;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errorForStatus_shouldMapStatusCodes() {
        assert!(matches!(
            error_for_status(429, Some(Duration::from_secs(3)), "slow down"),
            ProviderError::RateLimited { retry_after: Some(d), .. } if d == Duration::from_secs(3)
        ));
        assert!(matches!(error_for_status(401, None, ""), ProviderError::AuthFailed(_)));
        assert!(matches!(error_for_status(403, None, ""), ProviderError::AuthFailed(_)));
        assert!(matches!(error_for_status(503, None, ""), ProviderError::Transient(_)));
        assert!(matches!(error_for_status(408, None, ""), ProviderError::Transient(_)));
        assert!(matches!(error_for_status(400, None, ""), ProviderError::Malformed(_)));
    }

    #[test]
    fn test_parseRetryAfter_shouldAcceptSeconds() {
        assert_eq!(parse_retry_after("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-3"), None);
        assert_eq!(parse_retry_after("NaN"), None);
    }

    #[test]
    fn test_parseRetryAfter_withOversizedValue_shouldClamp() {
        assert_eq!(parse_retry_after("1e30"), Some(MAX_RETRY_AFTER));
        assert_eq!(parse_retry_after("inf"), Some(MAX_RETRY_AFTER));
        assert_eq!(parse_retry_after("18446744073709551615"), Some(MAX_RETRY_AFTER));
        assert_eq!(parse_retry_after("86400"), Some(MAX_RETRY_AFTER));
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_cleanModelReply_shouldStripFencesAndQuotes() {
        assert_eq!(clean_model_reply("```text\nCiao mondo\n```"), "Ciao mondo");
        assert_eq!(clean_model_reply("\"Ciao mondo\""), "Ciao mondo");
        assert_eq!(clean_model_reply("  Ciao  "), "Ciao");
        assert_eq!(clean_model_reply("\"a\" e \"b\""), "\"a\" e \"b\"");
    }

    #[test]
    fn test_buildSystemPrompt_shouldFillLanguagesAndContext() {
        let request = TranslationRequest::new("Hello", "en", "it", "key")
            .with_context(Some("A cozy farming game".to_string()));
        let prompt = build_system_prompt("From {source_language} to {target_language}.", &request);
        assert!(prompt.starts_with("From English to Italian."));
        assert!(prompt.contains("A cozy farming game"));
    }

    #[test]
    fn test_registry_withMock_shouldResolveByKind() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(mock::MockProvider::working().with_kind(TranslationProvider::DeepL)));
        assert!(registry.contains(TranslationProvider::DeepL));
        assert!(registry.get(TranslationProvider::OpenAI).is_none());
    }
}
