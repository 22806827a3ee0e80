//! CLI error types.

use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The LLM credential is missing from the environment.
    #[error("OPENAI_API_KEY not set. Export it or put it in a .env file")]
    MissingApiKey,

    /// The startup reachability check against the LLM backend failed.
    #[error("backend unreachable: {0}")]
    Probe(chat::ModelError),

    /// Configuration is invalid or unreadable.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// An error occurred in the chat layer.
    #[error(transparent)]
    Chat(#[from] chat::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
