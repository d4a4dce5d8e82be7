//! Per-evaluation context shared by every engine

use chrono::{DateTime, Utc};

use super::config::EvaluatorConfig;
use super::errors::{EvaluationError, EvaluationResult};
use super::price::PriceContext;
use crate::catalog::{Catalog, CollectionIndex, Locale, PriceType};
use crate::query::{GroupRelation, Query, Require};

/// Immutable state of one query evaluation
pub struct QueryContext<'a> {
    pub catalog: &'a dyn Catalog,
    pub config: &'a EvaluatorConfig,
    /// Clock captured once per evaluation
    pub now: DateTime<Utc>,
    pub locale: Option<Locale>,
    pub prices: PriceContext,
    pub price_type: PriceType,
    require: &'a Require,
}

impl<'a> QueryContext<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        config: &'a EvaluatorConfig,
        query: &'a Query,
        locale: Option<Locale>,
    ) -> Self {
        let now = config.now.unwrap_or_else(Utc::now);
        Self {
            catalog,
            config,
            now,
            locale,
            prices: PriceContext::from_filter(&query.filter_by, now),
            price_type: query.require.price_type(),
            require: &query.require,
        }
    }

    pub fn collection(&self, name: &str) -> EvaluationResult<&'a dyn CollectionIndex> {
        self.catalog
            .collection(name)
            .ok_or_else(|| EvaluationError::CollectionUnavailable(name.to_string()))
    }

    /// Locale applied to an attribute lookup
    pub fn locale_for(&self, localized: bool) -> Option<&Locale> {
        if localized {
            self.locale.as_ref()
        } else {
            None
        }
    }

    pub fn require(&self) -> &'a Require {
        self.require
    }

    pub fn is_negated(&self, reference: &str, group: Option<u32>) -> bool {
        self.require
            .has_group_relation(GroupRelation::Negation, reference, group)
    }

    /// Facets of the group combine with `and` instead of `or`
    pub fn is_conjunctive(&self, reference: &str, group: Option<u32>) -> bool {
        self.require
            .has_group_relation(GroupRelation::Conjunction, reference, group)
    }

    /// The group joins other groups with `or` instead of `and`
    pub fn is_disjunctive(&self, reference: &str, group: Option<u32>) -> bool {
        self.require
            .has_group_relation(GroupRelation::Disjunction, reference, group)
    }
}
