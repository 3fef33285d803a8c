//! Error types for the CLI

use baaskit_core::{CoreError, FailureReason};
use baaskit_dispatch::DispatchError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] baaskit_config::ConfigError),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Dispatcher error: {0}")]
    Dispatch(#[from] DispatchError),

    /// The server (or a precondition) refused the operation
    #[error("{0}")]
    Failed(#[from] FailureReason),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not logged in. Run 'baaskit login' first.")]
    NotLoggedIn,

    #[error("General error: {0}")]
    General(String),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::General(err.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
