use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, TranslationCommonConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::providers::{build_system_prompt, clean_model_reply, http_client, send_json, Provider, TranslationRequest};

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic client for interacting with Anthropic API
#[derive(Debug)]
pub struct Anthropic {
    /// HTTP client for API requests
    client: Client,
    /// API endpoint URL
    endpoint: String,
    /// Model name
    model: String,
    /// System prompt template
    system_prompt: String,
    /// Sampling temperature
    temperature: f32,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    /// The content of the response
    #[serde(default)]
    pub content: Vec<AnthropicContent>,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    /// The type of content
    #[serde(rename = "type")]
    pub content_type: String,

    /// The actual text content
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    /// Create a new Anthropic request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Anthropic {
    /// Create a new Anthropic client
    pub fn new(config: &ProviderConfig, common: &TranslationCommonConfig) -> Self {
        Self {
            client: http_client(config.timeout()),
            endpoint: config.effective_endpoint().unwrap_or_default(),
            model: config.effective_model().unwrap_or_default(),
            system_prompt: common.system_prompt.clone(),
            temperature: common.temperature,
        }
    }

    /// Token budget for a reply; game strings are short but may expand in translation
    fn max_tokens_for(text: &str) -> u32 {
        let estimate = (text.chars().count() as u32).saturating_mul(2);
        estimate.clamp(256, 4096)
    }

    /// Extract text from Anthropic response
    pub fn extract_text_from_response(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

#[async_trait]
impl Provider for Anthropic {
    fn kind(&self) -> TranslationProvider {
        TranslationProvider::Anthropic
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let api_url = format!("{}/v1/messages", self.endpoint);
        let body = AnthropicRequest::new(&self.model, Self::max_tokens_for(&request.text))
            .system(build_system_prompt(&self.system_prompt, request))
            .temperature(self.temperature)
            .add_message("user", &request.text);

        debug!("Claude request: model={}, chars={}", self.model, request.text.chars().count());

        let http_request = self
            .client
            .post(&api_url)
            .header("x-api-key", &request.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response: AnthropicResponse = send_json(http_request, "Claude").await?;
        if response.content.is_empty() {
            return Err(ProviderError::Malformed("Claude response contained no content".to_string()));
        }

        Ok(clean_model_reply(&Self::extract_text_from_response(&response)))
    }
}
