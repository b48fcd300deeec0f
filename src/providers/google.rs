use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::providers::{http_client, send_json, Provider, TranslationRequest};

/// Google Cloud Translation v2 client
#[derive(Debug)]
pub struct GoogleTranslate {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct GoogleRequest<'a> {
    q: [&'a str; 1],
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct GoogleResponse {
    pub data: Option<GoogleData>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleData {
    #[serde(default)]
    pub translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleTranslation {
    pub translated_text: String,
}

impl GoogleTranslate {
    /// Create a new Google Translate client
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: http_client(config.timeout()),
            endpoint: config.effective_endpoint().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Provider for GoogleTranslate {
    fn kind(&self) -> TranslationProvider {
        TranslationProvider::Google
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let body = GoogleRequest {
            q: [request.text.as_str()],
            source: request.source_language.trim(),
            target: request.target_language.trim(),
            // Plain text keeps `<`, `&` and friends unescaped in the reply
            format: "text",
        };

        debug!("Google request: {} -> {}, chars={}", body.source, body.target, request.text.chars().count());

        let http_request = self
            .client
            .post(&self.endpoint)
            .query(&[("key", request.api_key.as_str())])
            .json(&body);

        let response: GoogleResponse = send_json(http_request, "Google Translate").await?;

        response
            .data
            .and_then(|data| data.translations.into_iter().next())
            .map(|t| t.translated_text)
            .ok_or_else(|| ProviderError::Malformed("Google response contained no translations".to_string()))
    }
}
