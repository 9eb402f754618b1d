//! Text generation seam.
//!
//! Summarization is the only place Strata calls out to a language model.
//! It does so through [`TextGenerator`]; concrete backends live in
//! `strata-providers`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// A single-prompt generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,

    /// Sampling temperature (0.0 = deterministic).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.3
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Generated text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,

    /// Which model actually responded, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A human-readable name (e.g. "openai", "fallback").
    fn name(&self) -> &str;

    async fn generate_text(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate_text(
            &self,
            request: GenerationRequest,
        ) -> std::result::Result<GenerationResponse, GenerationError> {
            Ok(GenerationResponse {
                text: request.prompt,
                model: None,
            })
        }
    }

    #[test]
    fn request_defaults() {
        let req = GenerationRequest::new("hi");
        assert!((req.temperature - 0.3).abs() < f32::EPSILON);
        assert!(req.max_tokens.is_none());
    }

    #[tokio::test]
    async fn generator_is_object_safe() {
        let generator: Box<dyn TextGenerator> = Box::new(Echo);
        let response = generator
            .generate_text(GenerationRequest::new("ping").with_max_tokens(8))
            .await
            .unwrap();
        assert_eq!(response.text, "ping");
        assert_eq!(generator.name(), "echo");
    }
}
