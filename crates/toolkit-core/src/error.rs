use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("chain error: {0}")]
    Chain(chain_stark::error::StarkError),

    #[error("registry error: {0}")]
    Registry(registry::RegistryError),

    #[error("submission failed ({code}): {message}")]
    SubmissionFailure { code: String, message: String },

    #[error("transaction {tx_hash} still pending after {waited:?}")]
    PollingTimeout { tx_hash: String, waited: Duration },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("missing key: {0}")]
    MissingKey(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<chain_stark::error::StarkError> for ToolkitError {
    fn from(e: chain_stark::error::StarkError) -> Self {
        ToolkitError::Chain(e)
    }
}

impl From<registry::RegistryError> for ToolkitError {
    fn from(e: registry::RegistryError) -> Self {
        ToolkitError::Registry(e)
    }
}

impl From<reqwest::Error> for ToolkitError {
    fn from(e: reqwest::Error) -> Self {
        ToolkitError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ToolkitError {
    fn from(e: serde_json::Error) -> Self {
        ToolkitError::UnexpectedResponse(e.to_string())
    }
}

impl From<url::ParseError> for ToolkitError {
    fn from(e: url::ParseError) -> Self {
        ToolkitError::Config(e.to_string())
    }
}
