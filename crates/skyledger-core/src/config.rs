//! Skyledger configuration
//!
//! Loaded from TOML at startup, falls back to defaults if no config file
//! exists or it cannot be parsed.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Env vars consulted, in order, after the configured one.
const FALLBACK_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyledgerConfig {
    /// Env var holding the API key for the generative service and the oracle.
    pub api_key_env: String,
    /// Generative text service used by the chat assistant.
    pub service: ServiceConfig,
    /// Weather oracle.
    pub oracle: OracleConfig,
    /// Chat assistant behaviour.
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub model: String,
    pub base_url: String,
    /// Use the offline simulated oracle instead of the remote one.
    pub simulated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// First bot message of every transcript.
    pub greeting: String,
    /// Upper bound for a single oracle or service call.
    pub request_timeout_secs: u64,
}

// ============================================================
// Defaults
// ============================================================

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

impl Default for SkyledgerConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".into(),
            service: ServiceConfig::default(),
            oracle: OracleConfig::default(),
            agent: AgentSettings::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            max_tokens: 1024,
            temperature: None,
            system_prompt: None,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            simulated: false,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            greeting: "Hi! I'm your weather assistant. How can I help you today? \
                You can ask me things like 'What's the weather in Paris, France?'"
                .into(),
            request_timeout_secs: 60,
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl SkyledgerConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Resolve the API key from the configured env var, then the fallbacks.
    pub fn api_key(&self) -> Result<String> {
        std::iter::once(self.api_key_env.as_str())
            .chain(FALLBACK_KEY_VARS)
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no API key found; set {} (or run with --offline)",
                    self.api_key_env
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let config = SkyledgerConfig::load(Path::new("/nonexistent/skyledger.toml"));
        assert_eq!(config.service.model, DEFAULT_MODEL);
        assert_eq!(config.agent.request_timeout_secs, 60);
        assert!(!config.oracle.simulated);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skyledger.toml");
        std::fs::write(&path, "[oracle]\nsimulated = true\n\n[agent]\nrequest_timeout_secs = 5\n")
            .unwrap();

        let config = SkyledgerConfig::load(&path);
        assert!(config.oracle.simulated);
        assert_eq!(config.agent.request_timeout_secs, 5);
        assert_eq!(config.oracle.base_url, DEFAULT_BASE_URL);
        assert!(config.agent.greeting.starts_with("Hi!"));
    }

    #[test]
    fn unparsable_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[agent\nrequest_timeout_secs = ").unwrap();

        let config = SkyledgerConfig::load(&path);
        assert_eq!(config.agent.request_timeout_secs, 60);
    }

    #[test]
    fn toml_output_parses_back() {
        let config = SkyledgerConfig::default();
        let rendered = config.to_toml();
        let back: SkyledgerConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(back.service.max_tokens, config.service.max_tokens);
        assert_eq!(back.api_key_env, "GEMINI_API_KEY");
    }
}
