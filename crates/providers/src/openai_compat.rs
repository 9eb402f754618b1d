//! OpenAI-compatible chat-completions generator.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM, and any endpoint that
//! exposes `/chat/completions`. Each generation is a single user message;
//! streaming and tool calls are not needed for summaries.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_config::GeneratorConfig;
use strata_core::{GenerationError, GenerationRequest, GenerationResponse, TextGenerator};
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A [`TextGenerator`] over an OpenAI-compatible HTTP API.
pub struct OpenAiCompatGenerator {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatGenerator")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OpenAiCompatGenerator {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Build from the `[generator]` config section. Fails when no API key
    /// is configured.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GenerationError::NotConfigured("no API key for the summary generator".into()))?;
        Self::new("openai-compat", &config.base_url, api_key, &config.model)
    }

    /// Local Ollama endpoint; no key needed.
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Result<Self, GenerationError> {
        Self::new("ollama", base_url.unwrap_or("http://localhost:11434/v1"), "ollama", model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &GenerationRequest) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_text(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(generator = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(e.to_string())
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Generator returned error");
            return Err(status_error(status, error_body));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| GenerationError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        parse_response(api_response)
    }
}

/// Map a non-200 status to a typed error.
fn status_error(status: u16, body: String) -> GenerationError {
    match status {
        429 => GenerationError::RateLimited { retry_after_secs: 5 },
        401 | 403 => GenerationError::AuthenticationFailed("Invalid API key or insufficient permissions".into()),
        _ => GenerationError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

fn parse_response(response: ApiResponse) -> Result<GenerationResponse, GenerationError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)?;

    Ok(GenerationResponse {
        text,
        model: response.model,
    })
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
