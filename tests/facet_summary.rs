//! Facet Summary Tests
//!
//! Tests for facet counts, group relations and request impact:
//! - facets of different groups narrow each other (`and`)
//! - facets of one group widen each other (`or`)
//! - negated, conjunctive and disjunctive groups

mod common;

use catalogql::evaluator::{FacetSummary, RequestImpact};
use catalogql::query::{
    FacetGroupRelation, FacetStatisticsDepth, FacetSummarySpec, FilterConstraint, Query,
    RequireConstraint,
};

use common::{catalog, evaluate, primary_keys, BLUE, COLOR, LARGE, RED, SIZE, SMALL};

// =============================================================================
// Helper Functions
// =============================================================================

fn selecting(reference: &str, facets: &[u32]) -> FilterConstraint {
    FilterConstraint::facet_having(reference, vec![FilterConstraint::primary_keys(facets.iter().copied())])
}

fn impact_summary() -> RequireConstraint {
    RequireConstraint::FacetSummary(FacetSummarySpec {
        depth: FacetStatisticsDepth::Impact,
        ..Default::default()
    })
}

fn summary(filter: Vec<FilterConstraint>) -> FacetSummary {
    let query = Query::new("Product").filter(filter).require(vec![impact_summary()]);
    evaluate(&catalog(), &query).extra_results.facet_summary.unwrap()
}

fn impact(summary: &FacetSummary, reference: &str, facet: u32) -> RequestImpact {
    summary.facet(reference, facet).unwrap().impact.unwrap()
}

fn relation(reference: &str, groups: Option<Vec<u32>>) -> FacetGroupRelation {
    FacetGroupRelation {
        reference: reference.into(),
        groups,
    }
}

// =============================================================================
// Count Tests
// =============================================================================

#[test]
fn test_counts_without_selection() {
    let summary = summary(vec![]);
    for facet in [RED, BLUE, SMALL, LARGE] {
        let statistics = summary.facet("parameters", facet).unwrap();
        assert_eq!(statistics.count, 6);
        assert!(!statistics.requested);
    }
    assert_eq!(summary.facet("brand", 10).unwrap().count, 4);
    assert_eq!(summary.group("parameters", Some(COLOR)).unwrap().count, 12);
}

#[test]
fn test_group_order() {
    let summary = summary(vec![]);
    let groups: Vec<(&str, Option<u32>)> = summary
        .groups
        .iter()
        .map(|g| (g.reference_name.as_str(), g.group.as_ref().map(|b| b.primary_key)))
        .collect();
    assert_eq!(
        groups,
        vec![("brand", None), ("parameters", Some(COLOR)), ("parameters", Some(SIZE))]
    );
    let colors: Vec<u32> = summary.group("parameters", Some(COLOR)).unwrap()
        .facets
        .iter()
        .map(|f| f.facet.primary_key)
        .collect();
    assert_eq!(colors, vec![RED, BLUE]);
}

/// Facets with no holder among the mandatory candidates are left out.
#[test]
fn test_counts_follow_mandatory_filter() {
    let summary = summary(vec![
        FilterConstraint::attribute_less_than("priority", 61i64),
        FilterConstraint::user_filter(vec![selecting("parameters", &[RED])]),
    ]);
    assert_eq!(summary.facet("parameters", SMALL).unwrap().count, 6);
    assert!(summary.facet("parameters", LARGE).is_none());
    assert!(summary.facet("parameters", RED).unwrap().requested);
}

/// A `facetHaving` outside `userFilter` narrows the counts like any other filter.
#[test]
fn test_facet_outside_user_filter_is_mandatory() {
    let filter = vec![selecting("brand", &[10])];
    let response = evaluate(
        &catalog(),
        &Query::new("Product").filter(filter.clone()).require(vec![impact_summary()]),
    );
    assert_eq!(response.records.total_record_count(), 4);

    let summary = response.extra_results.facet_summary.unwrap();
    assert!(summary.facet("brand", 11).is_none());
    assert!(summary.facet("brand", 12).is_none());

    let brand = summary.facet("brand", 10).unwrap();
    assert!(!brand.requested);
    assert_eq!(brand.count, 4);
    assert_eq!(brand.impact.as_ref().unwrap().difference, 0);
    assert_eq!(summary.facet("parameters", RED).unwrap().count, 2);
}

// =============================================================================
// Impact Tests
// =============================================================================

#[test]
fn test_cross_group_selection_narrows() {
    let before = summary(vec![]);
    let after = summary(vec![FilterConstraint::user_filter(vec![selecting("parameters", &[RED])])]);

    let small_before = impact(&before, "parameters", SMALL);
    let small_after = impact(&after, "parameters", SMALL);
    assert_eq!(small_before.match_count, 6);
    assert_eq!(small_after.match_count, 3);
    assert_eq!(small_after.difference, -3);
    assert!(small_after.match_count <= small_before.match_count);
    assert_eq!(impact(&after, "brand", 10).match_count, 2);
}

#[test]
fn test_same_group_selection_widens() {
    let after = summary(vec![FilterConstraint::user_filter(vec![selecting("parameters", &[RED])])]);
    let blue = impact(&after, "parameters", BLUE);
    assert_eq!(blue.match_count, 12);
    assert_eq!(blue.difference, 6);
    assert!(blue.has_sense);
}

#[test]
fn test_selected_facet_impact_is_removal() {
    let after = summary(vec![FilterConstraint::user_filter(vec![selecting("parameters", &[RED])])]);
    let red = impact(&after, "parameters", RED);
    assert_eq!(red.match_count, 12);
    assert_eq!(red.difference, 6);
}

/// Adding a selection never raises the impact count of another group's facet.
#[test]
fn test_impact_monotonic_across_groups() {
    let before = summary(vec![]);
    let after = summary(vec![FilterConstraint::user_filter(vec![selecting("brand", &[11])])]);
    for facet in [RED, BLUE, SMALL, LARGE] {
        assert!(
            impact(&after, "parameters", facet).match_count
                <= impact(&before, "parameters", facet).match_count
        );
    }
}

// =============================================================================
// Group Relation Tests
// =============================================================================

#[test]
fn test_cross_group_and_same_group_or() {
    let catalog = catalog();
    let either = primary_keys(
        &catalog,
        Query::new("Product").filter(vec![FilterConstraint::user_filter(vec![selecting(
            "parameters",
            &[RED, BLUE],
        )])]),
    );
    assert_eq!(either.len(), 12);

    let both = primary_keys(
        &catalog,
        Query::new("Product").filter(vec![FilterConstraint::user_filter(vec![selecting(
            "parameters",
            &[RED, SMALL],
        )])]),
    );
    assert_eq!(both, vec![1, 3, 5]);
}

#[test]
fn test_negated_group() {
    let found = primary_keys(
        &catalog(),
        Query::new("Product")
            .filter(vec![FilterConstraint::user_filter(vec![selecting("parameters", &[RED])])])
            .require(vec![RequireConstraint::FacetGroupsNegation(relation(
                "parameters",
                Some(vec![COLOR]),
            ))]),
    );
    assert_eq!(found, vec![2, 4, 6, 8, 10, 12]);
}

#[test]
fn test_conjunctive_group() {
    let found = primary_keys(
        &catalog(),
        Query::new("Product")
            .filter(vec![FilterConstraint::user_filter(vec![selecting("parameters", &[RED, BLUE])])])
            .require(vec![RequireConstraint::FacetGroupsConjunction(relation(
                "parameters",
                Some(vec![COLOR]),
            ))]),
    );
    assert!(found.is_empty());
}

#[test]
fn test_disjunctive_group() {
    let found = primary_keys(
        &catalog(),
        Query::new("Product")
            .filter(vec![FilterConstraint::user_filter(vec![
                selecting("parameters", &[RED]),
                selecting("brand", &[10]),
            ])])
            .require(vec![RequireConstraint::FacetGroupsDisjunction(relation("brand", None))]),
    );
    assert_eq!(found, vec![1, 3, 5, 6, 7, 9, 11, 12]);
}

#[test]
fn test_summary_not_requested_is_absent() {
    let response = evaluate(&catalog(), &Query::new("Product"));
    assert!(response.extra_results.facet_summary.is_none());
}
