//! Yandex GPT provider (Yandex Cloud Foundation Models, synchronous completion).
//!
//! ```text
//! POST /foundationModels/v1/completion
//! Authorization: Api-Key <key>
//! {"modelUri": "gpt://<folder>/yandexgpt/latest",
//!  "completionOptions": {"stream": false, "temperature": 0.2, "maxTokens": 500},
//!  "messages": [{"role": "system", "text": "..."}, {"role": "user", "text": "..."}]}
//! ```
//!
//! The answer is `result.alternatives[0].message.text`.

use async_trait::async_trait;
use docbot_config::AssistantConfig;
use docbot_core::error::ProviderError;
use docbot_core::message::Message;
use docbot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str =
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// A Yandex GPT completion provider.
pub struct YandexGptProvider {
    api_url: String,
    api_key: String,
    folder_id: String,
    client: reqwest::Client,
}

impl YandexGptProvider {
    /// Create a provider for the given API key and folder.
    pub fn new(api_key: impl Into<String>, folder_id: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            api_key: api_key.into(),
            folder_id: folder_id.into(),
            client: Self::build_client(Duration::from_secs(30)),
        }
    }

    /// Build from configuration. `None` when the key or folder is missing.
    pub fn from_config(config: &AssistantConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        let api_key = config.api_key.clone()?;
        let folder_id = config.folder_id.clone()?;
        Some(
            Self::new(api_key, folder_id)
                .with_api_url(&config.api_url)
                .with_timeout(Duration::from_secs(config.timeout_secs)),
        )
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Self::build_client(timeout);
        self
    }

    fn build_client(timeout: Duration) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Full model URI. Models given as `gpt://...` are passed through.
    fn model_uri(&self, model: &str) -> String {
        if model.starts_with("gpt://") || model.starts_with("ds://") {
            model.to_string()
        } else {
            format!("gpt://{}/{}", self.folder_id, model)
        }
    }

    fn to_api_request<'a>(&self, request: &'a ProviderRequest) -> CompletionRequest<'a> {
        CompletionRequest {
            model_uri: self.model_uri(&request.model),
            completion_options: CompletionOptions {
                stream: false,
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            },
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    text: &m.content,
                })
                .collect(),
        }
    }

    /// Convert the API response into a `ProviderResponse`.
    fn from_api_response(
        response: CompletionResponse,
        requested_model: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let result = response.result;
        let alternative =
            result
                .alternatives
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No alternatives in response".into(),
                })?;

        let usage = result.usage.map(|u| Usage {
            prompt_tokens: u.input_text_tokens.map(|c| c.value()).unwrap_or(0),
            completion_tokens: u.completion_tokens.map(|c| c.value()).unwrap_or(0),
            total_tokens: u.total_tokens.map(|c| c.value()).unwrap_or(0),
        });

        Ok(ProviderResponse {
            message: Message::assistant(alternative.message.text),
            usage,
            model: result
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

#[async_trait]
impl Provider for YandexGptProvider {
    fn name(&self) -> &str {
        "yandexgpt"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = self.to_api_request(&request);

        debug!(
            provider = "yandexgpt",
            model = %body.model_uri,
            messages = body.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after_secs(response.headers()),
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: CompletionResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::from_api_response(api_response, &request.model)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(!self.api_key.is_empty() && !self.folder_id.is_empty())
    }
}

/// Seconds from a `Retry-After: <delta-seconds>` header. The HTTP-date form
/// and a missing header fall back to the default.
fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

// --- Yandex API types (internal) ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    message: AlternativeMessage,
}

#[derive(Debug, Deserialize)]
struct AlternativeMessage {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    input_text_tokens: Option<TokenCount>,
    #[serde(default)]
    completion_tokens: Option<TokenCount>,
    #[serde(default)]
    total_tokens: Option<TokenCount>,
}

/// Token counts arrive as JSON strings (int64 in proto3 JSON) or numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenCount {
    Number(u32),
    Text(String),
}

impl TokenCount {
    fn value(&self) -> u32 {
        match self {
            TokenCount::Number(n) => *n,
            TokenCount::Text(s) => s.parse().unwrap_or(0),
        }
    }
}
