use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, TranslationCommonConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::providers::{build_system_prompt, clean_model_reply, http_client, send_json, Provider, TranslationRequest};

/// Client for the OpenAI chat completions protocol
///
/// DeepSeek, Mistral and OpenRouter expose the same wire format, so one
/// adapter serves all four; only the endpoint and model differ.
#[derive(Debug)]
pub struct OpenAI {
    /// Provider this instance talks to
    kind: TranslationProvider,
    /// HTTP client for API requests
    client: Client,
    /// Base URL, e.g. `https://api.openai.com/v1`
    endpoint: String,
    /// Model name
    model: String,
    /// System prompt template
    system_prompt: String,
    /// Sampling temperature
    temperature: f32,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// The model to use
    model: String,
    /// The conversation
    messages: Vec<ChatMessage>,
    /// Temperature for generation
    temperature: f32,
}

/// A single chat message
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: Option<String>,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Generated choices
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// One generated choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The generated message
    pub message: ChatMessage,
}

impl ChatRequest {
    /// Create a request with a system prompt and one user message
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: Some(system.into()) },
                ChatMessage { role: "user".to_string(), content: Some(user.into()) },
            ],
            temperature,
        }
    }
}

impl OpenAI {
    /// Create a new client for an OpenAI-compatible provider
    pub fn new(kind: TranslationProvider, config: &ProviderConfig, common: &TranslationCommonConfig) -> Self {
        Self {
            kind,
            client: http_client(config.timeout()),
            endpoint: config.effective_endpoint().unwrap_or_default(),
            model: config.effective_model().unwrap_or_default(),
            system_prompt: common.system_prompt.clone(),
            temperature: common.temperature,
        }
    }

    /// Extract text from a chat completion response
    pub fn extract_text_from_response(response: &ChatResponse) -> Option<String> {
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn kind(&self) -> TranslationProvider {
        self.kind
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let api_url = format!("{}/chat/completions", self.endpoint);
        let body = ChatRequest::new(
            &self.model,
            build_system_prompt(&self.system_prompt, request),
            &request.text,
            self.temperature,
        );

        debug!("{} request: model={}, chars={}", self.kind.display_name(), self.model, request.text.chars().count());

        let mut http_request = self
            .client
            .post(&api_url)
            .bearer_auth(&request.api_key)
            .json(&body);
        if self.kind == TranslationProvider::OpenRouter {
            http_request = http_request.header("X-Title", "gamestringer");
        }

        let response: ChatResponse = send_json(http_request, self.kind.display_name()).await?;

        Self::extract_text_from_response(&response)
            .map(|text| clean_model_reply(&text))
            .ok_or_else(|| {
                ProviderError::Malformed(format!("{} response contained no choices", self.kind.display_name()))
            })
    }
}
