//! Histogram Tests
//!
//! Price and attribute histograms are computed over the filtered entities.

mod common;

use catalogql::evaluator::Histogram;
use catalogql::query::{FilterConstraint, HistogramBehavior, Query, RequireConstraint};

use common::{catalog, dec, evaluate};

fn price_histogram(filter: Vec<FilterConstraint>, buckets: usize) -> Option<Histogram> {
    let query = Query::new("Product")
        .filter(filter)
        .require(vec![RequireConstraint::PriceHistogram {
            bucket_count: buckets,
            behavior: HistogramBehavior::Standard,
        }]);
    evaluate(&catalog(), &query).extra_results.price_histogram
}

fn priority_histogram(filter: Vec<FilterConstraint>, buckets: usize) -> Option<Histogram> {
    let query = Query::new("Product")
        .filter(filter)
        .require(vec![RequireConstraint::AttributeHistogram {
            bucket_count: buckets,
            behavior: HistogramBehavior::Standard,
            names: vec!["priority".into()],
        }]);
    evaluate(&catalog(), &query)
        .extra_results
        .attribute_histograms
        .remove("priority")
}

fn occurrences(histogram: &Histogram) -> Vec<u64> {
    histogram.buckets.iter().map(|b| b.occurrences).collect()
}

// =============================================================================
// Price Histogram Tests
// =============================================================================

#[test]
fn test_price_histogram_covers_every_price_for_sale() {
    let histogram = price_histogram(vec![], 4).unwrap();
    assert_eq!(histogram.min, dec("92"));
    assert_eq!(histogram.max, dec("111"));
    assert_eq!(histogram.overall_count, 12);
    assert_eq!(occurrences(&histogram), vec![3, 3, 3, 3]);
    assert_eq!(histogram.buckets[0].threshold, dec("92"));
    assert!(histogram.buckets.iter().all(|b| !b.requested));
}

#[test]
fn test_price_histogram_marks_requested_buckets() {
    let histogram = price_histogram(
        vec![FilterConstraint::price_between(Some(dec("95")), Some(dec("101")))],
        2,
    )
    .unwrap();
    assert_eq!(histogram.min, dec("96"));
    assert_eq!(histogram.max, dec("101"));
    assert_eq!(occurrences(&histogram).iter().sum::<u64>(), 4);
    assert!(histogram.buckets.iter().all(|b| b.requested));
}

#[test]
fn test_price_histogram_absent_without_prices() {
    let histogram = price_histogram(vec![FilterConstraint::primary_keys([77])], 4);
    assert!(histogram.is_none());
}

// =============================================================================
// Attribute Histogram Tests
// =============================================================================

#[test]
fn test_attribute_histogram() {
    let histogram = priority_histogram(vec![], 4).unwrap();
    assert_eq!(histogram.min, dec("10"));
    assert_eq!(histogram.max, dec("120"));
    assert_eq!(occurrences(&histogram), vec![3, 3, 3, 3]);
}

#[test]
fn test_attribute_histogram_follows_between_filter() {
    let histogram = priority_histogram(
        vec![FilterConstraint::attribute_between("priority", 30i64, 60i64)],
        3,
    )
    .unwrap();
    assert_eq!(occurrences(&histogram), vec![1, 1, 2]);
    assert!(histogram.buckets.iter().all(|b| b.requested));
}

#[test]
fn test_optimized_histogram_has_no_empty_bucket() {
    let query = Query::new("Product")
        .filter(vec![FilterConstraint::primary_keys([1, 2, 12])])
        .require(vec![RequireConstraint::AttributeHistogram {
            bucket_count: 6,
            behavior: HistogramBehavior::Optimized,
            names: vec!["priority".into()],
        }]);
    let response = evaluate(&catalog(), &query);
    let histogram = &response.extra_results.attribute_histograms["priority"];
    assert!(histogram.buckets.iter().all(|b| b.occurrences > 0));
    assert_eq!(histogram.overall_count, 3);
}

#[test]
fn test_attribute_histogram_absent_when_no_values() {
    assert!(priority_histogram(vec![FilterConstraint::primary_keys([77])], 4).is_none());
}
