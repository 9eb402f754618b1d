//! Generator fallback: ordered retry chain with per-entry timeouts.
//!
//! When a generator fails (timeout, rate limit, error, empty text), the next
//! one in the chain is tried. The last error is returned when all fail.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strata_core::{GenerationError, GenerationRequest, GenerationResponse, TextGenerator};
use tracing::{info, warn};

const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(120);

pub struct FallbackGenerator {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl FallbackGenerator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Append a generator with its own timeout.
    pub fn add(mut self, generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { generator, timeout });
        self
    }

    /// Append a generator with the default timeout (120s).
    pub fn add_default(self, generator: Arc<dyn TextGenerator>) -> Self {
        self.add(generator, DEFAULT_ENTRY_TIMEOUT)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl TextGenerator for FallbackGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_text(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let mut last_error = GenerationError::NotConfigured("No generators in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let generator_name = entry.generator.name();
            info!(
                generator = %generator_name,
                attempt = i + 1,
                total = self.chain.len(),
                "Fallback: trying generator"
            );

            match tokio::time::timeout(entry.timeout, entry.generator.generate_text(request.clone())).await {
                Ok(Ok(response)) if !response.text.trim().is_empty() => return Ok(response),
                Ok(Ok(_)) => {
                    warn!(generator = %generator_name, "Fallback: generator returned no text, trying next");
                    last_error = GenerationError::EmptyResponse;
                }
                Ok(Err(e)) => {
                    warn!(generator = %generator_name, error = %e, "Fallback: generator failed, trying next");
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        generator = %generator_name,
                        timeout_secs = entry.timeout.as_secs(),
                        "Fallback: generator timed out, trying next"
                    );
                    last_error = GenerationError::Timeout(format!(
                        "Generator '{}' timed out after {}s",
                        generator_name,
                        entry.timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedGenerator {
        name: &'static str,
        reply: Result<&'static str, ()>,
        calls: AtomicUsize,
    }

    impl FixedGenerator {
        fn ok(name: &'static str, text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Ok(text),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Err(()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate_text(&self, _request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Ok(text) => Ok(GenerationResponse {
                    text: text.into(),
                    model: Some(self.name.into()),
                }),
                Err(()) => Err(GenerationError::Network("connection refused".into())),
            }
        }
    }

    struct HangingGenerator;

    #[async_trait]
    impl TextGenerator for HangingGenerator {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn generate_text(&self, _request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(GenerationError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn empty_chain_is_not_configured() {
        let chain = FallbackGenerator::new("empty");
        assert!(chain.is_empty());
        let err = chain.generate_text(GenerationRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn first_success_wins() {
        let primary = FixedGenerator::ok("primary", "from primary");
        let backup = FixedGenerator::ok("backup", "from backup");
        let chain = FallbackGenerator::new("chain")
            .add_default(primary.clone())
            .add_default(backup.clone());

        let response = chain.generate_text(GenerationRequest::new("x")).await.unwrap();
        assert_eq!(response.text, "from primary");
        assert_eq!(backup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_falls_through() {
        let chain = FallbackGenerator::new("chain")
            .add_default(FixedGenerator::failing("down"))
            .add_default(FixedGenerator::ok("empty", "  "))
            .add_default(FixedGenerator::ok("up", "recovered"));
        assert_eq!(chain.len(), 3);

        let response = chain.generate_text(GenerationRequest::new("x")).await.unwrap();
        assert_eq!(response.text, "recovered");
    }

    #[tokio::test]
    async fn last_error_returned_when_all_fail() {
        let chain = FallbackGenerator::new("chain")
            .add_default(FixedGenerator::failing("a"))
            .add_default(FixedGenerator::failing("b"));
        let err = chain.generate_text(GenerationRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Network(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_moves_to_next() {
        let chain = FallbackGenerator::new("chain")
            .add(Arc::new(HangingGenerator), Duration::from_secs(2))
            .add_default(FixedGenerator::ok("backup", "in time"));
        let response = chain.generate_text(GenerationRequest::new("x")).await.unwrap();
        assert_eq!(response.text, "in time");
    }
}
