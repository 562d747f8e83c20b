//! Error types for PostgreSQL operations.

use corral_core::PoolError;
use thiserror::Error;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur during PostgreSQL operations.
#[derive(Error, Debug)]
pub enum PgError {
    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// A referenced environment variable is not set.
    #[error("environment variable '{0}' is not set")]
    EnvNotFound(String),

    /// An environment variable reference could not be resolved.
    #[error("invalid environment variable '{name}': {message}")]
    InvalidEnvValue {
        /// Variable name.
        name: String,
        /// What was wrong.
        message: String,
    },

    /// Query returned something unexpected.
    #[error("query error: {0}")]
    Query(String),

    /// Timeout error.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Pool(_) | Self::Connection(_))
            || matches!(self, Self::Postgres(e) if e.is_closed())
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Pool(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// The SQLSTATE code, if the server reported one.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Postgres(e) => e.code().map(|c| c.code()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PgError::config("invalid URL");
        assert!(matches!(err, PgError::Config(_)));

        let err = PgError::connection("connection refused");
        assert!(err.is_connection_error());

        let err = PgError::Timeout(5000);
        assert!(err.is_timeout());
        assert_eq!(err.sql_state(), None);
    }

    #[test]
    fn test_pool_errors_convert() {
        let err: PgError = PoolError::ExhaustedTimeout { waited_ms: 30 }.into();
        assert!(err.is_timeout());
        assert!(err.is_connection_error());
        assert_eq!(err.to_string(), "pool error: no pool resource became free within 30ms");
    }
}
