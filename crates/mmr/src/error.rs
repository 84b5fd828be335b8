//! CLI error types.

use mmr_config::ConfigError;
use mmr_generator::GenerateError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Generate(#[from] GenerateError),

    #[error("generation task failed: {0}")]
    Task(String),
}
