//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::core::errors::{Result, TranslationError};

/// Base URLs of the provider APIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// DeepL base URL; derived from the key (free keys end in `:fx`) when unset
    pub deepl: Option<String>,
    /// Google Translate v2 base URL
    pub google_translate: String,
    /// OpenAI base URL
    pub openai: String,
    /// Gemini base URL
    pub gemini: String,
    /// Anthropic base URL
    pub anthropic: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            deepl: None,
            google_translate: "https://translation.googleapis.com/language/translate/v2"
                .to_string(),
            openai: "https://api.openai.com/v1".to_string(),
            gemini: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            anthropic: "https://api.anthropic.com/v1".to_string(),
        }
    }
}

/// Configuration for translator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Idle connections are closed after this many seconds
    pub pool_idle_timeout_secs: u64,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
    /// Value of the `anthropic-version` header
    pub anthropic_version: String,
    /// Provider base URLs
    pub endpoints: Endpoints,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60000,
            pool_idle_timeout_secs: 30,
            pool_max_idle_per_host: 10,
            anthropic_version: "2023-06-01".to_string(),
            endpoints: Endpoints::default(),
        }
    }
}

impl TranslatorConfig {
    /// Load from a JSON or YAML file, chosen by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: Self = if is_yaml(path) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        info!("Loaded translator configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(config_error("timeout_ms must be greater than 0"));
        }

        if self.anthropic_version.trim().is_empty() {
            return Err(config_error("anthropic_version is required"));
        }

        let endpoints = &self.endpoints;
        let required = [
            ("google_translate", &endpoints.google_translate),
            ("openai", &endpoints.openai),
            ("gemini", &endpoints.gemini),
            ("anthropic", &endpoints.anthropic),
        ];
        for (name, url) in required {
            check_url(name, url)?;
        }
        if let Some(deepl) = &endpoints.deepl {
            check_url("deepl", deepl)?;
        }

        if self.pool_max_idle_per_host == 0 {
            warn!("Connection pooling disabled (pool_max_idle_per_host = 0)");
        }

        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn check_url(name: &str, url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(config_error(&format!("endpoint '{}' is required", name)));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(config_error(&format!(
            "endpoint '{}' must be an http(s) URL, got '{}'",
            name, url
        )));
    }
    Ok(())
}

fn config_error(message: &str) -> TranslationError {
    TranslationError::ConfigError {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TranslatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let config = TranslatorConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_endpoint() {
        let mut config = TranslatorConfig::default();
        config.endpoints.openai = "api.openai.com".to_string();
        assert!(config.validate().is_err());

        let mut config = TranslatorConfig::default();
        config.endpoints.deepl = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polytl.yaml");

        let mut config = TranslatorConfig::default();
        config.timeout_ms = 5000;
        config.endpoints.deepl = Some("http://localhost:9000".to_string());
        config.to_file(&path).unwrap();

        let loaded = TranslatorConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polytl.json");
        std::fs::write(&path, r#"{"timeout_ms": 1500, "endpoints": {"openai": "http://127.0.0.1:1"}}"#)
            .unwrap();

        let loaded = TranslatorConfig::from_file(&path).unwrap();
        assert_eq!(loaded.timeout_ms, 1500);
        assert_eq!(loaded.endpoints.openai, "http://127.0.0.1:1");
        assert_eq!(loaded.endpoints.gemini, Endpoints::default().gemini);
        assert_eq!(loaded.anthropic_version, "2023-06-01");
    }
}
