//! Server configuration.
//!
//! Layered the way the rest of the stack expects: built-in defaults, then an
//! optional TOML file, then `QANAT_*` environment variables.

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::models::ModelConfig;

/// Upstream endpoint the default model talks to.
const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,

    /// Model identifier used when a request names none.
    pub default_model: String,

    /// Model allow-list.
    pub models: Vec<ModelConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            default_model: "ai-assistant".to_string(),
            models: vec![ModelConfig {
                id: "ai-assistant".to_string(),
                upstream_model: "deepseek-r1".to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                api_key_env: Some("OPENAI_API_KEY".to_string()),
            }],
        }
    }
}

impl ServerConfig {
    /// Load configuration, layering an optional file and `QANAT_*`
    /// environment variables over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix("QANAT").separator("__"));

        let config = builder.build().context("failed to read configuration")?;
        config
            .try_deserialize()
            .context("invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let cfg = ServerConfig::default();
        assert!(cfg.models.iter().any(|m| m.id == cfg.default_model));
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let cfg = ServerConfig::load(None).unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:8080");
        assert_eq!(cfg.default_model, "ai-assistant");
    }
}
