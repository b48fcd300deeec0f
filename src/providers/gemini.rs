use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, TranslationCommonConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::providers::{build_system_prompt, clean_model_reply, http_client, send_json, Provider, TranslationRequest};

/// Client for the Gemini generateContent API
#[derive(Debug)]
pub struct Gemini {
    client: Client,
    endpoint: String,
    model: String,
    system_prompt: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: GeminiContent,
}

impl GenerateRequest {
    fn new(system: String, user: &str, temperature: f32) -> Self {
        Self {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: user.to_string() }],
            }],
            generation_config: GenerationConfig { temperature },
        }
    }
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(config: &ProviderConfig, common: &TranslationCommonConfig) -> Self {
        Self {
            client: http_client(config.timeout()),
            endpoint: config.effective_endpoint().unwrap_or_default(),
            model: config.effective_model().unwrap_or_default(),
            system_prompt: common.system_prompt.clone(),
            temperature: common.temperature,
        }
    }

    /// Text of the first candidate, if any
    pub fn extract_text_from_response(response: &GenerateResponse) -> Option<String> {
        response.candidates.first().map(|candidate| {
            candidate
                .content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect()
        })
    }
}

#[async_trait]
impl Provider for Gemini {
    fn kind(&self) -> TranslationProvider {
        TranslationProvider::Gemini
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let api_url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = GenerateRequest::new(
            build_system_prompt(&self.system_prompt, request),
            &request.text,
            self.temperature,
        );

        debug!("Gemini request: model={}, chars={}", self.model, request.text.chars().count());

        let http_request = self
            .client
            .post(&api_url)
            .header("x-goog-api-key", &request.api_key)
            .json(&body);

        let response: GenerateResponse = send_json(http_request, "Gemini").await?;

        Self::extract_text_from_response(&response)
            .map(|text| clean_model_reply(&text))
            .ok_or_else(|| ProviderError::Malformed("Gemini response contained no candidates".to_string()))
    }
}
