//! `strata config`: Configuration management commands.

use std::path::{Path, PathBuf};

use strata_config::AppConfig;

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    config_path.map_or_else(AppConfig::config_path, Path::to_path_buf)
}

/// Copy of `config` safe to print.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if shown.generator.api_key.is_some() {
        shown.generator.api_key = Some("[REDACTED]".into());
    }
    shown
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", toml::to_string_pretty(&redacted(&config))?);
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", resolve_path(config_path).display());
    Ok(())
}

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}", resolve_path(config_path).display());

    let config = match super::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("  error: {e}");
            return Err(e.into());
        }
    };
    println!("  config parsed and validated");

    let mut warnings = Vec::new();
    if config.summarizer.enabled && !config.has_api_key() {
        warnings.push("No API key set (STRATA_API_KEY or OPENAI_API_KEY); summaries will be condensed locally");
    }
    if config.rerank.weight_sum() > 1.0 + 1e-9 {
        warnings.push("Rerank weights sum to more than 1.0; scores will exceed the 0..1 range");
    }
    if config
        .budget
        .limit_for(strata_core::Tier::LongTermMemory)
        .is_some_and(|limit| limit > config.budget.total_token_limit)
    {
        warnings.push("long_term_memory limit is larger than the total token limit");
    }

    for w in &warnings {
        println!("  warning: {w}");
    }

    println!();
    println!("  Total tokens: {}", config.budget.total_token_limit);
    println!("  RAG tokens:   {}", config.budget.rag_budget());
    println!("  Rerank top_k: {}", config.rerank.top_k);
    println!("  Model:        {}", config.generator.model);
    Ok(())
}

pub async fn init(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_path(config_path);
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_ends_in_config_toml() {
        let path = resolve_path(None);
        assert!(path.to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn explicit_path_wins() {
        assert_eq!(resolve_path(Some(Path::new("/tmp/x.toml"))), PathBuf::from("/tmp/x.toml"));
    }

    #[test]
    fn show_never_prints_key() {
        let mut config = AppConfig::default();
        config.generator.api_key = Some("sk-secret".into());
        let rendered = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn init_writes_loadable_file_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init(Some(&path), false).await.unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.budget.total_token_limit, 128_000);

        assert!(init(Some(&path), false).await.is_err());
        init(Some(&path), true).await.unwrap();
    }
}
