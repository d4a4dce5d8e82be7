//! Top-level query evaluation
//!
//! Phases run in a fixed order: filter, order, paging, fetch, hierarchy
//! statistics, facet summary, histograms. Each phase reads the immutable
//! catalog snapshot only, so one evaluator can serve concurrent queries.

use tracing::{debug, info};
use uuid::Uuid;

use super::candidate::CandidateSet;
use super::config::EvaluatorConfig;
use super::context::QueryContext;
use super::errors::{EvaluationError, EvaluationResult};
use super::facet::FacetSummaryEngine;
use super::fetch::EntityFetcher;
use super::filter::FilterEvaluator;
use super::hierarchy_stats::HierarchyStatistics;
use super::histogram::HistogramBuilder;
use super::order::OrderEvaluator;
use super::price::PriceResolver;
use super::response::{EvaluationResponse, ExtraResults, Window};
use super::telemetry::{QueryPhase, TelemetryRecorder};
use crate::catalog::{Catalog, CollectionIndex, Locale};
use crate::query::{OrderConstraint, Query, QueryValidator, RequireConstraint, Slice};

/// Evaluates queries against one catalog snapshot
pub struct QueryEvaluator<'a> {
    catalog: &'a dyn Catalog,
    config: EvaluatorConfig,
}

impl<'a> QueryEvaluator<'a> {
    pub fn new(catalog: &'a dyn Catalog, config: EvaluatorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Build-time checks only; returns the locale the query selects
    pub fn validate(&self, query: &Query) -> EvaluationResult<Option<Locale>> {
        self.config.validate()?;
        let locale = QueryValidator::new(self.catalog)
            .with_max_page_size(self.config.max_page_size)
            .validate(query)?;
        Ok(locale)
    }

    pub fn evaluate(&self, query: &Query) -> EvaluationResult<EvaluationResponse> {
        let evaluation_id = Uuid::new_v4();
        let locale = self.validate(query)?;
        let ctx = QueryContext::new(self.catalog, &self.config, query, locale);
        let collection = ctx.collection(&query.collection)?;
        let require = &query.require;
        let telemetry = TelemetryRecorder::new(require.telemetry());
        info!(
            evaluation_id = %evaluation_id,
            collection = %query.collection,
            "query accepted"
        );

        let phase = telemetry.begin(QueryPhase::Filter);
        let filter = FilterEvaluator::new(&ctx, collection);
        let outcome = filter.evaluate_parts(&query.filter_by)?;
        let mut candidates = CandidateSet::new(outcome.result.clone());
        let priced = ctx.prices.is_active() || wants_prices(query);
        if priced {
            let resolver = PriceResolver::new(collection.prices(), &ctx.prices, ctx.price_type);
            candidates = candidates.with_prices(&resolver);
        }
        phase.complete();
        debug!(candidates = candidates.len(), priced, "filter evaluated");

        let phase = telemetry.begin(QueryPhase::Order);
        let mut order = OrderEvaluator::new(&ctx, collection);
        if priced {
            order = order.with_prices(&candidates);
        }
        let ordered = order.sort(&candidates.ids, &query.order_by, Some(&query.filter_by));
        phase.complete();

        let phase = telemetry.begin(QueryPhase::Paging);
        let slice = require.slice().unwrap_or(Slice::Page {
            number: 1,
            size: self.config.default_page_size,
        });
        let window = Window::resolve(slice, ordered.len());
        phase.complete();
        debug!(offset = window.offset, length = window.length, "page sliced");

        let mut fetcher = EntityFetcher::new(&ctx, collection);
        if priced {
            fetcher = fetcher.with_prices(&candidates);
        }
        let phase = telemetry.begin(QueryPhase::Fetch);
        let entity_fetch = require.entity_fetch();
        let mut data = Vec::with_capacity(window.length);
        for pk in &ordered[window.range()] {
            let body = fetcher.fetch(collection, *pk, entity_fetch)?.ok_or_else(|| {
                EvaluationError::SnapshotInconsistency {
                    collection: query.collection.clone(),
                    primary_key: *pk,
                }
            })?;
            data.push(body);
        }
        phase.complete();
        let records = window.into_page(candidates.len(), data);

        let mut extra_results = ExtraResults::default();

        let phase = telemetry.begin(QueryPhase::Hierarchy);
        extra_results.hierarchy =
            HierarchyStatistics::new(&ctx, collection, &query.filter_by, &fetcher).compute(require)?;
        phase.complete();

        if require.facet_summary().is_some() || require.facet_summaries_of_reference().next().is_some() {
            let phase = telemetry.begin(QueryPhase::FacetSummary);
            let base = filter
                .evaluate_parts(&query.filter_by.without_user_filter())?
                .rest;
            extra_results.facet_summary =
                FacetSummaryEngine::new(&ctx, collection, &outcome, &base, &fetcher).compute(require)?;
            phase.complete();
        }

        let phase = telemetry.begin(QueryPhase::Histogram);
        histograms(&ctx, collection, query, &candidates, &mut extra_results);
        phase.complete();

        extra_results.query_telemetry = telemetry.finish();
        info!(
            evaluation_id = %evaluation_id,
            total = records.total_record_count(),
            returned = records.data().len(),
            "query evaluated"
        );
        Ok(EvaluationResponse {
            evaluation_id,
            records,
            extra_results,
        })
    }
}

/// Prices are selected up front when ordering or a histogram reads them
fn wants_prices(query: &Query) -> bool {
    query
        .require
        .constraints
        .iter()
        .any(|c| matches!(c, RequireConstraint::PriceHistogram { .. }))
        || query
            .order_by
            .constraints
            .iter()
            .any(|c| matches!(c, OrderConstraint::PriceNatural { .. }))
}

fn histograms(
    ctx: &QueryContext<'_>,
    collection: &dyn CollectionIndex,
    query: &Query,
    candidates: &CandidateSet,
    extra_results: &mut ExtraResults,
) {
    for constraint in &query.require.constraints {
        match constraint {
            RequireConstraint::PriceHistogram {
                bucket_count,
                behavior,
            } => {
                extra_results.price_histogram = HistogramBuilder::new(*bucket_count, *behavior)
                    .prices(candidates, ctx.price_type, ctx.prices.between.as_ref());
            }
            RequireConstraint::AttributeHistogram {
                bucket_count,
                behavior,
                names,
            } => {
                let builder = HistogramBuilder::new(*bucket_count, *behavior);
                for name in names {
                    if let Some(histogram) =
                        builder.attribute(ctx, collection, candidates, name, &query.filter_by)
                    {
                        extra_results.attribute_histograms.insert(name.clone(), histogram);
                    }
                }
            }
            _ => {}
        }
    }
    if let Some(histogram) = &extra_results.price_histogram {
        debug!(
            buckets = histogram.buckets.len(),
            min = %histogram.min,
            max = %histogram.max,
            "price histogram computed"
        );
    }
}

