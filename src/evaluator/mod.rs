//! Query evaluation engines
//!
//! [`QueryEvaluator`] drives one evaluation; the engines below it are
//! pure functions of the catalog snapshot and the query context.

pub mod candidate;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod facet;
pub mod fetch;
pub mod filter;
pub mod hierarchy;
pub mod hierarchy_stats;
pub mod histogram;
pub mod order;
pub mod price;
pub mod response;
pub mod telemetry;

pub use candidate::CandidateSet;
pub use config::EvaluatorConfig;
pub use context::QueryContext;
pub use engine::QueryEvaluator;
pub use errors::{EvaluationError, EvaluationErrorCode, EvaluationResult};
pub use facet::{FacetGroupStatistics, FacetStatistics, FacetSummary, RequestImpact};
pub use fetch::{EntityBody, EntityFetcher, ReferenceBody};
pub use filter::{FilterEvaluator, FilterOutcome};
pub use hierarchy::{HierarchyResolver, HierarchyScope};
pub use hierarchy_stats::{Hierarchy, LevelInfo};
pub use histogram::{Bucket, Histogram, HistogramBuilder};
pub use order::OrderEvaluator;
pub use price::{PriceContext, PriceForSale, PriceInterval, PriceResolver};
pub use response::{EvaluationResponse, ExtraResults, RecordPage};
pub use telemetry::{PhaseTelemetry, QueryPhase, QueryTelemetry};
