use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::providers::{http_client, send_json, Provider, TranslationRequest};

const DEEPL_FREE_ENDPOINT: &str = "https://api-free.deepl.com";
const DEEPL_PRO_ENDPOINT: &str = "https://api.deepl.com";

/// DeepL v2 translate client
#[derive(Debug)]
pub struct DeepL {
    client: Client,
    /// Explicit endpoint; empty means pick free or pro from the key
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct DeepLRequest<'a> {
    text: [&'a str; 1],
    source_lang: String,
    target_lang: String,
    preserve_formatting: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeepLResponse {
    #[serde(default)]
    pub translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
pub struct DeepLTranslation {
    pub text: String,
}

impl DeepL {
    /// Create a new DeepL client
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: http_client(config.timeout()),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Free-tier keys end with `:fx` and must use the free host
    pub fn endpoint_for_key(&self, api_key: &str) -> String {
        if !self.endpoint.is_empty() {
            self.endpoint.clone()
        } else if api_key.trim().ends_with(":fx") {
            DEEPL_FREE_ENDPOINT.to_string()
        } else {
            DEEPL_PRO_ENDPOINT.to_string()
        }
    }

    /// DeepL wants upper-case codes; source codes carry no region
    pub fn language_code(code: &str, is_source: bool) -> String {
        let code = code.trim().replace('_', "-").to_uppercase();
        if is_source {
            code.split('-').next().unwrap_or_default().to_string()
        } else {
            code
        }
    }
}

#[async_trait]
impl Provider for DeepL {
    fn kind(&self) -> TranslationProvider {
        TranslationProvider::DeepL
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let api_url = format!("{}/v2/translate", self.endpoint_for_key(&request.api_key));
        let body = DeepLRequest {
            text: [request.text.as_str()],
            source_lang: Self::language_code(&request.source_language, true),
            target_lang: Self::language_code(&request.target_language, false),
            preserve_formatting: true,
        };

        debug!("DeepL request: {} -> {}, chars={}", body.source_lang, body.target_lang, request.text.chars().count());

        let http_request = self
            .client
            .post(&api_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", request.api_key))
            .json(&body);

        let response: DeepLResponse = send_json(http_request, "DeepL").await?;

        response
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| ProviderError::Malformed("DeepL response contained no translations".to_string()))
    }
}
