use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found; wrote defaults to {0}, edit it and restart")]
    Created(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid JSON: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Validation(String),
}

/// Runtime settings, either from CLI flags or a JSON config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgramConfig {
    /// Number of crawl workers to start.
    pub crawlers: usize,
    /// User agent token sent with every request.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Linking tasks a worker may have in flight before it stops popping.
    pub max_inflight_links: usize,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            crawlers: 4,
            user_agent: "WebIndexBot/1.0".to_string(),
            timeout_secs: 20,
            max_inflight_links: 8,
        }
    }
}

impl ProgramConfig {
    /// Loads settings from a JSON file. A missing file is written out with
    /// defaults and reported as an error so the operator can review it.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            let defaults = Self::default();
            std::fs::write(path, serde_json::to_string_pretty(&defaults)?)?;
            return Err(ConfigError::Created(path.to_string()));
        }

        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawlers == 0 {
            return Err(ConfigError::Validation(
                "crawlers must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeoutSecs must be at least 1".to_string(),
            ));
        }
        if self.max_inflight_links == 0 {
            return Err(ConfigError::Validation(
                "maxInflightLinks must be at least 1".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "userAgent must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
