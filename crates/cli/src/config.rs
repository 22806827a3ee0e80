//! Configuration loading from skiff.toml.

use mcp::ServerConfig;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Tool server to spawn.
    #[serde(default = "default_server")]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            server: default_server(),
        }
    }
}

/// Backend provider configuration.
///
/// The API key is deliberately not part of the file; it comes from the
/// environment (optionally via .env) so config files stay shareable.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Response token budget per model call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Alternate OpenAI-compatible endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    2024
}

fn default_server() -> ServerConfig {
    ServerConfig {
        command: "python".to_string(),
        args: vec!["research_server.py".to_string()],
        env: Default::default(),
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
