//! Configuration loading, validation, and management for Strata.
//!
//! Loads configuration from `~/.strata/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_core::{ContextBudget, FusionConfig, RerankConfig};

/// The root configuration structure.
///
/// Maps directly to `~/.strata/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Token budget for assembled contexts
    #[serde(default)]
    pub budget: ContextBudget,

    /// Reranker weights and cut-off
    #[serde(default)]
    pub rerank: RerankConfig,

    /// Rank fusion settings
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Rolling summarizer settings
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Text generation backend used by the summarizer
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Rolling summarizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// When false, dropped history is always condensed locally.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on one generation call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_summary_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_summary_temperature() -> f32 {
    0.3
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_timeout_secs(),
            temperature: default_summary_temperature(),
            max_tokens: None,
        }
    }
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Models tried in order on the same endpoint when `model` fails.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_models: Vec<String>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            fallback_models: Vec::new(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("fallback_models", &self.fallback_models)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.strata/config.toml).
    ///
    /// Environment overrides, highest priority first:
    /// - `STRATA_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `STRATA_MODEL`
    /// - `STRATA_BASE_URL`
    /// - `STRATA_TOTAL_TOKENS`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`, then re-validate.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.generator.api_key.is_none() {
            self.generator.api_key = lookup("STRATA_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(model) = lookup("STRATA_MODEL") {
            self.generator.model = model;
        }

        if let Some(base_url) = lookup("STRATA_BASE_URL") {
            self.generator.base_url = base_url;
        }

        if let Some(total) = lookup("STRATA_TOTAL_TOKENS") {
            self.budget.total_token_limit = total.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "STRATA_TOTAL_TOKENS must be a positive integer, got '{total}'"
                ))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".strata")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.budget
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("budget: {e}")))?;

        let rerank = &self.rerank;
        for (name, weight) in [
            ("keyword_weight", rerank.keyword_weight),
            ("vector_weight", rerank.vector_weight),
            ("recency_weight", rerank.recency_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "rerank.{name} must be a non-negative number"
                )));
            }
        }
        if !(rerank.recency_window_hours.is_finite() && rerank.recency_window_hours > 0.0) {
            return Err(ConfigError::ValidationError(
                "rerank.recency_window_hours must be > 0".into(),
            ));
        }
        if rerank.top_k == 0 {
            return Err(ConfigError::ValidationError("rerank.top_k must be > 0".into()));
        }

        if self.fusion.rrf_weight < 0.0 || self.fusion.similarity_weight < 0.0 {
            return Err(ConfigError::ValidationError(
                "fusion weights must be non-negative".into(),
            ));
        }

        if self.summarizer.temperature < 0.0 || self.summarizer.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "summarizer.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.summarizer.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "summarizer.timeout_secs must be > 0".into(),
            ));
        }

        if self.generator.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "generator.base_url must not be empty".into(),
            ));
        }
        if self.generator.fallback_models.iter().any(|m| m.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "generator.fallback_models must not contain empty names".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.generator.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            budget: ContextBudget::default(),
            rerank: RerankConfig::default(),
            fusion: FusionConfig::default(),
            summarizer: SummarizerConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.budget.total_token_limit, 128_000);
        assert_eq!(config.summarizer.timeout_secs, 30);
        assert!(config.summarizer.enabled);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.budget, config.budget);
        assert_eq!(parsed.rerank, config.rerank);
        assert_eq!(parsed.generator.model, config.generator.model);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.rerank.top_k, 100);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[budget]
total_token_limit = 8000
rag_token_limit = 2000

[rerank]
keyword_weight = 0.4
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.budget.total_token_limit, 8000);
        assert_eq!(config.budget.rag_budget(), 2000);
        assert_eq!(config.budget.tier_limits.working_set, None);
        assert_eq!(config.rerank.keyword_weight, 0.4);
        assert_eq!(config.rerank.vector_weight, 0.5);
        assert_eq!(config.summarizer.timeout_secs, 30);
    }

    #[test]
    fn invalid_budget_in_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[budget]\ntotal_token_limit = 100\nrag_token_limit = 500\n"
        )
        .unwrap();

        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[budget\ntotal_token_limit = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.summarizer.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn fallback_models_parse_and_validate() {
        let config: AppConfig = toml::from_str(
            r#"
            [generator]
            model = "gpt-4o"
            fallback_models = ["gpt-4o-mini", "gpt-3.5-turbo"]
            "#,
        )
        .unwrap();
        assert_eq!(config.generator.fallback_models, vec!["gpt-4o-mini", "gpt-3.5-turbo"]);
        assert!(config.validate().is_ok());

        let mut config = AppConfig::default();
        config.generator.fallback_models = vec![" ".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_rerank_weight_rejected() {
        let mut config = AppConfig::default();
        config.rerank.vector_weight = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-openai"),
                ("STRATA_MODEL", "local-model"),
                ("STRATA_BASE_URL", "http://localhost:11434/v1"),
                ("STRATA_TOTAL_TOKENS", "4096"),
            ]))
            .unwrap();
        assert_eq!(config.generator.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(config.generator.model, "local-model");
        assert_eq!(config.generator.base_url, "http://localhost:11434/v1");
        assert_eq!(config.budget.total_token_limit, 4096);
    }

    #[test]
    fn strata_key_wins_over_openai_key() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("STRATA_API_KEY", "sk-strata"), ("OPENAI_API_KEY", "sk-openai")]))
            .unwrap();
        assert_eq!(config.generator.api_key.as_deref(), Some("sk-strata"));
    }

    #[test]
    fn bad_total_tokens_env_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("STRATA_TOTAL_TOKENS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("lots"));
    }

    #[test]
    fn api_key_redacted_in_debug() {
        let mut config = AppConfig::default();
        config.generator.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("total_token_limit = 128000"));
        assert!(toml_str.contains("keyword_weight"));
        assert!(toml_str.contains("gpt-4o-mini"));
    }
}
