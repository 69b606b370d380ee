// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// YAML for `.yaml`/`.yml`, JSON otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Load check configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<MonitorConfig> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    parse_config(&contents, ConfigFormat::from_path(path))
}

pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<MonitorConfig> {
    let config: MonitorConfig = match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        }
        ConfigFormat::Json => {
            serde_json::from_str(contents).context("Failed to parse JSON config")?
        }
    };

    config.validate()?;
    Ok(config)
}
