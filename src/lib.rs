//! catalogql - declarative query evaluation over product catalogs
//!
//! A query selects one collection and combines three constraint trees:
//! `filterBy` narrows the candidate set, `orderBy` sorts it and `require`
//! picks the page, the fetched content and the extra results (facet
//! summary, hierarchy statistics, histograms, telemetry).
//!
//! ```ignore
//! let catalog = MemoryCatalog::load(Path::new("catalog.json"))?;
//! let query = Query::new("Product")
//!     .filter(vec![FilterConstraint::attribute_equals("code", "x")])
//!     .require(vec![RequireConstraint::Page { number: 1, size: 10 }]);
//! let response = QueryEvaluator::new(&catalog, EvaluatorConfig::default()).evaluate(&query)?;
//! ```

pub mod catalog;
pub mod cli;
pub mod evaluator;
pub mod query;
