//! Query constraint tree
//!
//! A query is built once, validated against the catalog schemas and then
//! handed to the evaluator read-only. Each constraint kind is one variant
//! carrying its own payload; engines dispatch with exhaustive matches.

pub mod errors;
pub mod filter;
pub mod order;
#[allow(clippy::module_inception)]
pub mod query;
pub mod require;
pub mod validate;

pub use errors::{QueryError, QueryErrorCode, QueryResult};
pub use filter::{AttributeSpecialValue, FilterBy, FilterConstraint, HierarchySpecification};
pub use order::{OrderBy, OrderConstraint, OrderDirection};
pub use query::Query;
pub use require::{
    AxisSpec, EmptyHierarchicalEntityBehaviour, EntityContent, EntityFetch, FacetGroupRelation,
    FacetStatisticsDepth, FacetSummaryOfReference, FacetSummarySpec, FromNodeSpec, GroupRelation,
    HierarchyOfReference, HierarchyOfSelf, HierarchyRequirement, HistogramBehavior,
    PriceContentMode, ReferenceContent, Require, RequireConstraint, Slice, Statistics,
    StatisticsBase, StatisticsType, StopAt,
};
pub use validate::{price_constraints, query_locale, QueryValidator};
