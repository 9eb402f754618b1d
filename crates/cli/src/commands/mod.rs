pub mod assemble;
pub mod config_cmd;
pub mod fuse;
pub mod rerank;

use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use strata_config::{AppConfig, ConfigError};

/// Load the config from `path` when given, else from the default location.
/// Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => AppConfig::load(),
    }
}

/// Read a whole file, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()).into())
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON in {}: {e}", path.display()).into())
}
