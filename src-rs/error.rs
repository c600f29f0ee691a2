use thiserror::Error;

use crate::config::ConfigError;
use crate::llm::ProviderError;
use crate::tools::TransportError;

/// Failures while assembling an agent, before any session runs.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("model client setup failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("http client setup failed: {0}")]
    Client(#[from] TransportError),
    #[error("{0} provider selected but no {1} found")]
    MissingCredentials(String, &'static str),
}
