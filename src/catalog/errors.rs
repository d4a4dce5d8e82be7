//! Catalog snapshot error types
//!
//! Error codes:
//! - CQL_CATALOG_DUPLICATE_COLLECTION (REJECT)
//! - CQL_CATALOG_DUPLICATE_PRIMARY_KEY (REJECT)
//! - CQL_CATALOG_PRIMARY_KEY_POLICY (REJECT)
//! - CQL_CATALOG_HIERARCHY_CYCLE (REJECT)
//! - CQL_CATALOG_NOT_HIERARCHICAL (REJECT)
//! - CQL_CATALOG_UNDECLARED (REJECT)
//! - CQL_CATALOG_TYPE_MISMATCH (REJECT)
//! - CQL_CATALOG_LOCALE_NOT_ALLOWED (REJECT)
//! - CQL_CATALOG_CARDINALITY (REJECT)
//! - CQL_CATALOG_INVALID_SNAPSHOT (REJECT)

use std::fmt;

use thiserror::Error;

/// Severity levels shared by all error families of the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Input rejected before any evaluation happened
    Reject,
    /// Evaluation started and failed as a whole
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Catalog error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorCode {
    DuplicateCollection,
    DuplicatePrimaryKey,
    PrimaryKeyPolicy,
    HierarchyCycle,
    NotHierarchical,
    Undeclared,
    TypeMismatch,
    LocaleNotAllowed,
    Cardinality,
    InvalidSnapshot,
}

impl CatalogErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateCollection => "CQL_CATALOG_DUPLICATE_COLLECTION",
            Self::DuplicatePrimaryKey => "CQL_CATALOG_DUPLICATE_PRIMARY_KEY",
            Self::PrimaryKeyPolicy => "CQL_CATALOG_PRIMARY_KEY_POLICY",
            Self::HierarchyCycle => "CQL_CATALOG_HIERARCHY_CYCLE",
            Self::NotHierarchical => "CQL_CATALOG_NOT_HIERARCHICAL",
            Self::Undeclared => "CQL_CATALOG_UNDECLARED",
            Self::TypeMismatch => "CQL_CATALOG_TYPE_MISMATCH",
            Self::LocaleNotAllowed => "CQL_CATALOG_LOCALE_NOT_ALLOWED",
            Self::Cardinality => "CQL_CATALOG_CARDINALITY",
            Self::InvalidSnapshot => "CQL_CATALOG_INVALID_SNAPSHOT",
        }
    }

    /// Snapshot problems are always detected before a query runs
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for CatalogErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while assembling an in-memory catalog snapshot
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("collection `{0}` declared twice")]
    DuplicateCollection(String),

    #[error("collection `{collection}` contains primary key {primary_key} twice")]
    DuplicatePrimaryKey { collection: String, primary_key: u32 },

    #[error("collection `{collection}`: {reason}")]
    PrimaryKeyPolicy { collection: String, reason: String },

    #[error("collection `{collection}`: hierarchy cycle through primary key {primary_key}")]
    HierarchyCycle { collection: String, primary_key: u32 },

    #[error("collection `{collection}` is not hierarchical but entity {primary_key} has a parent")]
    NotHierarchical { collection: String, primary_key: u32 },

    #[error("collection `{collection}`: undeclared {kind} `{name}`")]
    Undeclared {
        collection: String,
        kind: &'static str,
        name: String,
    },

    #[error("collection `{collection}`: attribute `{attribute}` expects {expected}, entity {primary_key} holds {found}")]
    TypeMismatch {
        collection: String,
        primary_key: u32,
        attribute: String,
        expected: String,
        found: String,
    },

    #[error("collection `{collection}`: locale `{locale}` not allowed for `{name}`")]
    LocaleNotAllowed {
        collection: String,
        name: String,
        locale: String,
    },

    #[error("collection `{collection}`: entity {primary_key} holds {count} references `{reference}` ({cardinality})")]
    Cardinality {
        collection: String,
        primary_key: u32,
        reference: String,
        count: usize,
        cardinality: String,
    },

    #[error("invalid catalog snapshot: {0}")]
    InvalidSnapshot(String),
}

impl CatalogError {
    pub fn undeclared(collection: &str, kind: &'static str, name: &str) -> Self {
        CatalogError::Undeclared {
            collection: collection.to_string(),
            kind,
            name: name.to_string(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> CatalogErrorCode {
        match self {
            CatalogError::DuplicateCollection(_) => CatalogErrorCode::DuplicateCollection,
            CatalogError::DuplicatePrimaryKey { .. } => CatalogErrorCode::DuplicatePrimaryKey,
            CatalogError::PrimaryKeyPolicy { .. } => CatalogErrorCode::PrimaryKeyPolicy,
            CatalogError::HierarchyCycle { .. } => CatalogErrorCode::HierarchyCycle,
            CatalogError::NotHierarchical { .. } => CatalogErrorCode::NotHierarchical,
            CatalogError::Undeclared { .. } => CatalogErrorCode::Undeclared,
            CatalogError::TypeMismatch { .. } => CatalogErrorCode::TypeMismatch,
            CatalogError::LocaleNotAllowed { .. } => CatalogErrorCode::LocaleNotAllowed,
            CatalogError::Cardinality { .. } => CatalogErrorCode::Cardinality,
            CatalogError::InvalidSnapshot(_) => CatalogErrorCode::InvalidSnapshot,
        }
    }

    pub fn severity(&self) -> Severity {
        self.code().severity()
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
