//! CLI error types
//!
//! Error codes:
//! - CQL_CLI_CONFIG_ERROR
//! - CQL_CLI_IO_ERROR
//! - CQL_CLI_INPUT_ERROR
//!
//! Catalog and evaluation failures keep the code of their own family.

use std::io;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::evaluator::EvaluationError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdin/stdout)
    IoError,
    /// Malformed query input
    InputError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "CQL_CLI_CONFIG_ERROR",
            Self::IoError => "CQL_CLI_IO_ERROR",
            Self::InputError => "CQL_CLI_INPUT_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}: {0}", CliErrorCode::ConfigError.code())]
    Config(String),

    #[error("{}: {0}", CliErrorCode::IoError.code())]
    Io(String),

    #[error("{}: {0}", CliErrorCode::InputError.code())]
    Input(String),

    #[error("{}: {0}", .0.code().code())]
    Catalog(#[from] CatalogError),

    #[error("{}: {0}", .0.code_str())]
    Evaluation(#[from] EvaluationError),
}

impl CliError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        CliError::Config(msg.into())
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        CliError::Io(msg.into())
    }

    pub fn input_error(msg: impl Into<String>) -> Self {
        CliError::Input(msg.into())
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        match self {
            CliError::Config(_) => CliErrorCode::ConfigError.code(),
            CliError::Io(_) => CliErrorCode::IoError.code(),
            CliError::Input(_) => CliErrorCode::InputError.code(),
            CliError::Catalog(e) => e.code().code(),
            CliError::Evaluation(e) => e.code_str(),
        }
    }

    /// Message without the code prefix
    pub fn message(&self) -> String {
        match self {
            CliError::Config(m) | CliError::Io(m) | CliError::Input(m) => m.clone(),
            CliError::Catalog(e) => e.to_string(),
            CliError::Evaluation(e) => e.to_string(),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryError;

    #[test]
    fn test_code_strings() {
        assert_eq!(CliError::config_error("x").code_str(), "CQL_CLI_CONFIG_ERROR");
        assert_eq!(CliError::input_error("x").code_str(), "CQL_CLI_INPUT_ERROR");
        let err: CliError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code_str(), "CQL_CLI_IO_ERROR");
    }

    #[test]
    fn test_wrapped_errors_keep_their_code() {
        let err: CliError = EvaluationError::from(QueryError::UnknownCollection("Nope".into())).into();
        assert_eq!(err.code_str(), "CQL_QUERY_UNKNOWN_COLLECTION");
        assert!(err.to_string().starts_with("CQL_QUERY_UNKNOWN_COLLECTION: "));
        assert!(err.message().contains("Nope"));
    }
}
