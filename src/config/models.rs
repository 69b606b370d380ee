// src/config/models.rs
use crate::health::Check;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Check name must not be empty")]
    EmptyName,

    #[error("Check '{0}' is configured more than once")]
    DuplicateName(String),

    #[error("Check '{0}' has a ttl of zero")]
    ZeroTtl(String),

    #[error("Check '{0}' has a timeout of zero; omit timeout_ms for no deadline")]
    ZeroTimeout(String),
}

/// Polling settings for a check. Unset fields fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl CheckConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.ttl_ms == Some(0) {
            return Err(ConfigError::ZeroTtl(name.to_string()));
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout(name.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCheckConfig {
    pub name: String,
    #[serde(flatten)]
    pub settings: CheckConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub defaults: CheckConfig,
    #[serde(default)]
    pub checks: Vec<NamedCheckConfig>,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate("defaults")?;

        let mut seen = HashSet::new();
        for entry in &self.checks {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateName(entry.name.clone()));
            }
            entry.settings.validate(&entry.name)?;
        }

        Ok(())
    }

    pub fn settings_for(&self, name: &str) -> Option<&CheckConfig> {
        self.checks
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.settings)
    }

    /// Applies the configured ttl/timeout for `check.name`, then the defaults.
    /// Values set in neither place are left as they are on the check.
    pub fn apply(&self, mut check: Check) -> Check {
        let settings = self.settings_for(&check.name);

        if let Some(ttl) = settings.and_then(CheckConfig::ttl).or_else(|| self.defaults.ttl()) {
            check.ttl = ttl;
        }
        if let Some(timeout) = settings
            .and_then(CheckConfig::timeout)
            .or_else(|| self.defaults.timeout())
        {
            check.timeout = Some(timeout);
        }

        check
    }
}
