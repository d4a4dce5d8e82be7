//! Evaluation-time error types
//!
//! A query either fully succeeds or fails with exactly one of these.
//! Empty candidate sets, absent prices and missing translations are not
//! errors.
//!
//! Error codes:
//! - CQL_EVAL_INVALID_QUERY (REJECT)
//! - CQL_EVAL_COLLECTION_UNAVAILABLE (ERROR)
//! - CQL_EVAL_SNAPSHOT_INCONSISTENCY (ERROR)
//! - CQL_EVAL_NESTED_QUERY_FAILED (ERROR)
//! - CQL_EVAL_INVALID_CONFIG (REJECT)

use std::fmt;

use thiserror::Error;

use crate::catalog::Severity;
use crate::query::QueryError;

/// Evaluation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationErrorCode {
    InvalidQuery,
    CollectionUnavailable,
    SnapshotInconsistency,
    NestedQueryFailed,
    InvalidConfig,
}

impl EvaluationErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuery => "CQL_EVAL_INVALID_QUERY",
            Self::CollectionUnavailable => "CQL_EVAL_COLLECTION_UNAVAILABLE",
            Self::SnapshotInconsistency => "CQL_EVAL_SNAPSHOT_INCONSISTENCY",
            Self::NestedQueryFailed => "CQL_EVAL_NESTED_QUERY_FAILED",
            Self::InvalidConfig => "CQL_EVAL_INVALID_CONFIG",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::InvalidQuery | Self::InvalidConfig => Severity::Reject,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for EvaluationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Evaluation errors
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("collection `{0}` is not available in the catalog snapshot")]
    CollectionUnavailable(String),

    #[error("snapshot of `{collection}` lists entity {primary_key} but cannot return it")]
    SnapshotInconsistency { collection: String, primary_key: u32 },

    #[error("nested query over `{collection}` failed: {source}")]
    Nested {
        collection: String,
        #[source]
        source: Box<EvaluationError>,
    },

    #[error("invalid evaluator configuration: {0}")]
    InvalidConfig(String),
}

impl EvaluationError {
    pub fn nested(collection: impl Into<String>, source: EvaluationError) -> Self {
        EvaluationError::Nested {
            collection: collection.into(),
            source: Box::new(source),
        }
    }

    pub fn code(&self) -> EvaluationErrorCode {
        match self {
            EvaluationError::Query(_) => EvaluationErrorCode::InvalidQuery,
            EvaluationError::CollectionUnavailable(_) => EvaluationErrorCode::CollectionUnavailable,
            EvaluationError::SnapshotInconsistency { .. } => {
                EvaluationErrorCode::SnapshotInconsistency
            }
            EvaluationError::Nested { .. } => EvaluationErrorCode::NestedQueryFailed,
            EvaluationError::InvalidConfig(_) => EvaluationErrorCode::InvalidConfig,
        }
    }

    /// Stable string code; build-time failures keep their query code
    pub fn code_str(&self) -> &'static str {
        match self {
            EvaluationError::Query(e) => e.code().code(),
            other => other.code().code(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.code().severity()
    }

    /// Innermost cause across nested query failures
    pub fn root_cause(&self) -> &EvaluationError {
        match self {
            EvaluationError::Nested { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for evaluation
pub type EvaluationResult<T> = Result<T, EvaluationError>;
