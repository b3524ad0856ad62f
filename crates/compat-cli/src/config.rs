//! CLI configuration loaded from an optional YAML file

use anyhow::{Context, Result};
use compat_core::Format;
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Defaults applied when a flag is omitted
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Compatibility mode for `check` without `--mode`
    pub default_mode: String,
    /// Schema format for commands without `--format`
    #[serde(deserialize_with = "deserialize_format")]
    pub default_format: Option<Format>,
    /// Default tracing filter directive; `RUST_LOG` overrides it
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_mode: "BACKWARD".to_string(),
            default_format: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load the configuration file, or the built-in defaults when no path is
    /// given.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document means every default
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

fn deserialize_format<'de, D>(deserializer: D) -> std::result::Result<Option<Format>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|name| name.parse().map_err(serde::de::Error::custom))
        .transpose()
}
