//! Query build-time error types
//!
//! Every error here is detected before evaluation starts and is never
//! retried.
//!
//! Error codes:
//! - CQL_QUERY_UNKNOWN_COLLECTION (REJECT)
//! - CQL_QUERY_UNKNOWN_ATTRIBUTE (REJECT)
//! - CQL_QUERY_UNKNOWN_REFERENCE (REJECT)
//! - CQL_QUERY_UNKNOWN_ASSOCIATED_DATA (REJECT)
//! - CQL_QUERY_TYPE_MISMATCH (REJECT)
//! - CQL_QUERY_MISSING_LOCALE (REJECT)
//! - CQL_QUERY_CONFLICTING_LOCALES (REJECT)
//! - CQL_QUERY_NOT_HIERARCHICAL (REJECT)
//! - CQL_QUERY_NOT_FACETED (REJECT)
//! - CQL_QUERY_NOT_FILTERABLE (REJECT)
//! - CQL_QUERY_NOT_SORTABLE (REJECT)
//! - CQL_QUERY_NOT_NUMERIC (REJECT)
//! - CQL_QUERY_MISSING_FILTER_FOR_ORDER (REJECT)
//! - CQL_QUERY_PAGE_SIZE_EXCEEDED (REJECT)
//! - CQL_QUERY_INVALID_COMPOSITION (REJECT)

use std::fmt;

use thiserror::Error;

use crate::catalog::Severity;

/// Query error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    UnknownCollection,
    UnknownAttribute,
    UnknownReference,
    UnknownAssociatedData,
    TypeMismatch,
    MissingLocale,
    ConflictingLocales,
    NotHierarchical,
    NotFaceted,
    NotFilterable,
    NotSortable,
    NotNumeric,
    MissingFilterForOrder,
    PageSizeExceeded,
    InvalidComposition,
}

impl QueryErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCollection => "CQL_QUERY_UNKNOWN_COLLECTION",
            Self::UnknownAttribute => "CQL_QUERY_UNKNOWN_ATTRIBUTE",
            Self::UnknownReference => "CQL_QUERY_UNKNOWN_REFERENCE",
            Self::UnknownAssociatedData => "CQL_QUERY_UNKNOWN_ASSOCIATED_DATA",
            Self::TypeMismatch => "CQL_QUERY_TYPE_MISMATCH",
            Self::MissingLocale => "CQL_QUERY_MISSING_LOCALE",
            Self::ConflictingLocales => "CQL_QUERY_CONFLICTING_LOCALES",
            Self::NotHierarchical => "CQL_QUERY_NOT_HIERARCHICAL",
            Self::NotFaceted => "CQL_QUERY_NOT_FACETED",
            Self::NotFilterable => "CQL_QUERY_NOT_FILTERABLE",
            Self::NotSortable => "CQL_QUERY_NOT_SORTABLE",
            Self::NotNumeric => "CQL_QUERY_NOT_NUMERIC",
            Self::MissingFilterForOrder => "CQL_QUERY_MISSING_FILTER_FOR_ORDER",
            Self::PageSizeExceeded => "CQL_QUERY_PAGE_SIZE_EXCEEDED",
            Self::InvalidComposition => "CQL_QUERY_INVALID_COMPOSITION",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query build-time errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown collection `{0}`")]
    UnknownCollection(String),

    #[error("collection `{collection}` declares no attribute `{attribute}`")]
    UnknownAttribute { collection: String, attribute: String },

    #[error("collection `{collection}` declares no reference `{reference}`")]
    UnknownReference { collection: String, reference: String },

    #[error("collection `{collection}` declares no associated data `{name}`")]
    UnknownAssociatedData { collection: String, name: String },

    #[error("`{constraint}` on attribute `{attribute}` expects {expected}, got {found}")]
    TypeMismatch {
        constraint: &'static str,
        attribute: String,
        expected: String,
        found: String,
    },

    #[error("attribute `{attribute}` is localized; the query must select a locale with entityLocaleEquals")]
    MissingLocale { attribute: String },

    #[error("query selects conflicting locales `{0}` and `{1}`")]
    ConflictingLocales(String, String),

    #[error("collection `{0}` is not hierarchical")]
    NotHierarchical(String),

    #[error("reference `{reference}` of `{collection}` is not faceted")]
    NotFaceted { collection: String, reference: String },

    #[error("attribute `{attribute}` of `{collection}` is not filterable")]
    NotFilterable { collection: String, attribute: String },

    #[error("attribute `{attribute}` of `{collection}` is not sortable")]
    NotSortable { collection: String, attribute: String },

    #[error("attribute `{attribute}` of `{collection}` is not numeric")]
    NotNumeric { collection: String, attribute: String },

    #[error("`{constraint}` ordering requires a matching `{filter}` filter constraint")]
    MissingFilterForOrder {
        constraint: &'static str,
        filter: &'static str,
    },

    #[error("page size {size} exceeds maximum {max}")]
    PageSizeExceeded { size: usize, max: usize },

    #[error("invalid query composition: {0}")]
    InvalidComposition(String),
}

impl QueryError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        QueryError::InvalidComposition(reason.into())
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        match self {
            QueryError::UnknownCollection(_) => QueryErrorCode::UnknownCollection,
            QueryError::UnknownAttribute { .. } => QueryErrorCode::UnknownAttribute,
            QueryError::UnknownReference { .. } => QueryErrorCode::UnknownReference,
            QueryError::UnknownAssociatedData { .. } => QueryErrorCode::UnknownAssociatedData,
            QueryError::TypeMismatch { .. } => QueryErrorCode::TypeMismatch,
            QueryError::MissingLocale { .. } => QueryErrorCode::MissingLocale,
            QueryError::ConflictingLocales(_, _) => QueryErrorCode::ConflictingLocales,
            QueryError::NotHierarchical(_) => QueryErrorCode::NotHierarchical,
            QueryError::NotFaceted { .. } => QueryErrorCode::NotFaceted,
            QueryError::NotFilterable { .. } => QueryErrorCode::NotFilterable,
            QueryError::NotSortable { .. } => QueryErrorCode::NotSortable,
            QueryError::NotNumeric { .. } => QueryErrorCode::NotNumeric,
            QueryError::MissingFilterForOrder { .. } => QueryErrorCode::MissingFilterForOrder,
            QueryError::PageSizeExceeded { .. } => QueryErrorCode::PageSizeExceeded,
            QueryError::InvalidComposition(_) => QueryErrorCode::InvalidComposition,
        }
    }

    pub fn severity(&self) -> Severity {
        self.code().severity()
    }
}

/// Result type for query construction and validation
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            QueryError::UnknownCollection("X".into()).code().code(),
            "CQL_QUERY_UNKNOWN_COLLECTION"
        );
        assert_eq!(
            QueryError::MissingLocale {
                attribute: "name".into()
            }
            .code()
            .code(),
            "CQL_QUERY_MISSING_LOCALE"
        );
    }

    #[test]
    fn test_all_build_errors_reject() {
        let err = QueryError::invalid("page number must be positive");
        assert_eq!(err.severity(), Severity::Reject);
        assert!(err.to_string().contains("page number"));
    }
}
