//! Rolling summarizer: condenses dropped history into one paragraph.
//!
//! Generation is delegated to a [`TextGenerator`]. Failures, empty
//! responses, and timeouts never reach the caller: the summarizer falls
//! back to [`fallback_summary`], which needs no model at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strata_core::{ContextItem, GenerationRequest, TextGenerator};
use tracing::{debug, warn};

/// Characters of each item kept by the local fallback.
pub const FALLBACK_EXCERPT_CHARS: usize = 50;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SUMMARY_INSTRUCTIONS: &str = "Summarize the following earlier context into a short paragraph. \
Keep decisions, facts, names, identifiers, and open questions that later turns may rely on. \
Do not add information that is not present. Reply with the summary only.";

/// Turns a batch of context items into a summary string.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Never fails; returns an empty string for empty input.
    async fn summarize(&self, items: &[ContextItem]) -> String;
}

/// `[TAG] content` lines, one per item.
fn tagged_lines<'a>(items: &'a [ContextItem], excerpt: impl Fn(&'a str) -> &'a str) -> String {
    items
        .iter()
        .map(|item| format!("[{}] {}", item.item_type.tag(), excerpt(&item.content)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deterministic local summary: each item's type tag and first 50
/// characters, one per line.
pub fn fallback_summary(items: &[ContextItem]) -> String {
    tagged_lines(items, |content| match content.char_indices().nth(FALLBACK_EXCERPT_CHARS) {
        Some((cut, _)) => &content[..cut],
        None => content,
    })
}

/// The prompt sent to the generator.
pub fn summary_prompt(items: &[ContextItem]) -> String {
    format!("{SUMMARY_INSTRUCTIONS}\n\n{}", tagged_lines(items, |content| content))
}

/// [`Summarizer`] backed by an optional text generator.
pub struct RollingSummarizer {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl RollingSummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
            timeout: DEFAULT_TIMEOUT,
            temperature: 0.3,
            max_tokens: None,
        }
    }

    /// A summarizer that always uses the local fallback.
    pub fn local() -> Self {
        Self {
            generator: None,
            timeout: DEFAULT_TIMEOUT,
            temperature: 0.3,
            max_tokens: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
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

impl std::fmt::Debug for RollingSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingSummarizer")
            .field("generator", &self.generator.as_ref().map(|g| g.name()))
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[async_trait]
impl Summarizer for RollingSummarizer {
    async fn summarize(&self, items: &[ContextItem]) -> String {
        if items.is_empty() {
            return String::new();
        }

        let Some(generator) = &self.generator else {
            return fallback_summary(items);
        };

        let mut request = GenerationRequest::new(summary_prompt(items)).with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        match tokio::time::timeout(self.timeout, generator.generate_text(request)).await {
            Ok(Ok(response)) if !response.text.trim().is_empty() => {
                debug!(generator = generator.name(), items = items.len(), "Summarized dropped context");
                response.text.trim().to_string()
            }
            Ok(Ok(_)) => {
                warn!(generator = generator.name(), "Summary generation returned no text, using local summary");
                fallback_summary(items)
            }
            Ok(Err(e)) => {
                warn!(generator = generator.name(), error = %e, "Summary generation failed, using local summary");
                fallback_summary(items)
            }
            Err(_) => {
                warn!(
                    generator = generator.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Summary generation timed out, using local summary"
                );
                fallback_summary(items)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use strata_core::{GenerationError, GenerationResponse, ItemType, Tier};

    /// Returns scripted responses in order and records every prompt.
    struct ScriptedGenerator {
        responses: Mutex<Vec<Result<String, GenerationError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_text(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
            self.prompts.lock().unwrap().push(request.prompt);
            let next = self.responses.lock().unwrap().remove(0);
            next.map(|text| GenerationResponse { text, model: None })
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate_text(&self, _request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(GenerationResponse {
                text: "too late".into(),
                model: None,
            })
        }
    }

    fn turn(content: &str) -> ContextItem {
        ContextItem::new("t", Tier::WorkingSet, ItemType::ChatMessage, content, 1, 0)
    }

    #[test]
    fn fallback_truncates_to_fifty_chars() {
        let long = "x".repeat(80);
        let summary = fallback_summary(&[turn(&long), turn("short")]);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], format!("[CHAT_MESSAGE] {}", "x".repeat(50)));
        assert_eq!(lines[1], "[CHAT_MESSAGE] short");
    }

    #[test]
    fn fallback_counts_characters_not_bytes() {
        let text = "é".repeat(60);
        let summary = fallback_summary(&[turn(&text)]);
        assert_eq!(summary, format!("[CHAT_MESSAGE] {}", "é".repeat(50)));
    }

    #[test]
    fn prompt_lists_tagged_items() {
        let item = ContextItem::new("r", Tier::WorkingSet, ItemType::ToolResult, "42 rows", 1, 0);
        let prompt = summary_prompt(&[item]);
        assert!(prompt.starts_with(SUMMARY_INSTRUCTIONS));
        assert!(prompt.ends_with("[TOOL_RESULT] 42 rows"));
    }

    #[tokio::test]
    async fn empty_input_is_empty_summary() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let summarizer = RollingSummarizer::new(generator.clone());
        assert_eq!(summarizer.summarize(&[]).await, "");
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn uses_generated_text() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok("  The user asked about Rust.  ".into())]));
        let summarizer = RollingSummarizer::new(generator.clone());
        let summary = summarizer.summarize(&[turn("tell me about rust")]).await;
        assert_eq!(summary, "The user asked about Rust.");
        assert!(generator.prompts.lock().unwrap()[0].contains("[CHAT_MESSAGE] tell me about rust"));
    }

    #[tokio::test]
    async fn generation_error_falls_back() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(GenerationError::Network(
            "connection refused".into(),
        ))]));
        let summarizer = RollingSummarizer::new(generator);
        let summary = summarizer.summarize(&[turn("hello there")]).await;
        assert_eq!(summary, "[CHAT_MESSAGE] hello there");
    }

    #[tokio::test]
    async fn blank_response_falls_back() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok("   ".into())]));
        let summarizer = RollingSummarizer::new(generator);
        assert_eq!(summarizer.summarize(&[turn("hi")]).await, "[CHAT_MESSAGE] hi");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_back() {
        let summarizer = RollingSummarizer::new(Arc::new(SlowGenerator)).with_timeout(Duration::from_secs(5));
        let summary = summarizer.summarize(&[turn("slow path")]).await;
        assert_eq!(summary, "[CHAT_MESSAGE] slow path");
    }

    #[tokio::test]
    async fn local_summarizer_never_calls_out() {
        let summary = RollingSummarizer::local().summarize(&[turn("offline")]).await;
        assert_eq!(summary, "[CHAT_MESSAGE] offline");
    }
}
