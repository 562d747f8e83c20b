//! CLI error types and result alias.

use corral_core::{BatchError, PoolError};
use corral_postgres::PgError;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(corral::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(corral::config), help("check corral.toml and the DATABASE_URL / CORRAL_PG_* variables"))]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(corral::database))]
    Database(#[from] PgError),

    /// Pool error
    #[error("Pool error: {0}")]
    #[diagnostic(code(corral::pool))]
    Pool(#[from] PoolError),

    /// One or more tasks of a batch failed
    #[error("Batch error: {0}")]
    #[diagnostic(code(corral::batch))]
    Batch(#[from] BatchError),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(corral::command))]
    Command(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::Config(format!("Failed to serialize TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Command(format!("Failed to encode JSON: {}", err))
    }
}
