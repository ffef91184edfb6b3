//! Model registry: validated mapping from model identifier to configuration.
//!
//! Built once at startup from the configured allow-list and looked up per
//! request. An empty key is an explicit rule resolving to the default model;
//! an unknown key fails with a not-found condition rather than defaulting
//! silently.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for one allow-listed model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Identifier clients select this model by, and the `model` value echoed
    /// in stream frames.
    pub id: String,

    /// Model name sent to the upstream provider.
    pub upstream_model: String,

    /// Base URL of the OpenAI-compatible provider.
    pub base_url: String,

    /// Environment variable holding the provider API key, if any.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl ModelConfig {
    /// Resolve the API key from the environment, if configured and set.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown model: {0}")]
    NotFound(String),

    #[error("default model {0} is not in the allow list")]
    BadDefault(String),

    #[error("model allow list is empty")]
    EmptyAllowList,
}

/// Registry of allow-listed models, keyed by identifier.
pub struct ModelRegistry {
    models: HashMap<String, ModelConfig>,
    default_id: String,
}

impl ModelRegistry {
    pub fn new(entries: Vec<ModelConfig>, default_id: impl Into<String>) -> Result<Self, ModelError> {
        if entries.is_empty() {
            return Err(ModelError::EmptyAllowList);
        }
        let default_id = default_id.into();
        let models: HashMap<String, ModelConfig> = entries
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();
        if !models.contains_key(&default_id) {
            return Err(ModelError::BadDefault(default_id));
        }
        Ok(Self { models, default_id })
    }

    /// Look up a model by identifier. An empty key resolves to the default.
    pub fn resolve(&self, key: &str) -> Result<&ModelConfig, ModelError> {
        let key = if key.is_empty() {
            self.default_id.as_str()
        } else {
            key
        };
        self.models
            .get(key)
            .ok_or_else(|| ModelError::NotFound(key.to_string()))
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> ModelConfig {
        ModelConfig {
            id: id.to_string(),
            upstream_model: format!("{id}-v1"),
            base_url: "http://localhost:9999/v1".to_string(),
            api_key_env: None,
        }
    }

    #[test]
    fn empty_key_resolves_to_default() {
        let registry = ModelRegistry::new(vec![entry("a"), entry("b")], "b").unwrap();
        assert_eq!(registry.resolve("").unwrap().id, "b");
    }

    #[test]
    fn known_key_resolves_to_its_entry() {
        let registry = ModelRegistry::new(vec![entry("a"), entry("b")], "b").unwrap();
        assert_eq!(registry.resolve("a").unwrap().id, "a");
    }

    #[test]
    fn unknown_key_is_not_found() {
        let registry = ModelRegistry::new(vec![entry("a")], "a").unwrap();
        assert!(matches!(
            registry.resolve("nope"),
            Err(ModelError::NotFound(k)) if k == "nope"
        ));
    }

    #[test]
    fn default_must_be_allow_listed() {
        assert!(matches!(
            ModelRegistry::new(vec![entry("a")], "missing"),
            Err(ModelError::BadDefault(_))
        ));
        assert!(matches!(
            ModelRegistry::new(vec![], "a"),
            Err(ModelError::EmptyAllowList)
        ));
    }
}
