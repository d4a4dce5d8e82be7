//! Filter Algebra Tests
//!
//! - `and()` without children admits the universe, `or()` admits nothing
//! - `not(x)` is the complement of `x` within the universe
//! - primary key sets round-trip through fetch

mod common;

use std::collections::BTreeSet;

use catalogql::catalog::Scalar;
use catalogql::query::{FilterConstraint, Query};
use proptest::prelude::*;

use common::{catalog, primary_keys};

fn universe() -> BTreeSet<u32> {
    (1..=12).collect()
}

fn keys(constraint: FilterConstraint) -> BTreeSet<u32> {
    primary_keys(&catalog(), Query::new("Product").filter(vec![constraint]))
        .into_iter()
        .collect()
}

// =============================================================================
// Identities
// =============================================================================

#[test]
fn test_empty_and_is_universe() {
    assert_eq!(keys(FilterConstraint::and(vec![])), universe());
}

#[test]
fn test_empty_or_is_empty() {
    assert!(keys(FilterConstraint::or(vec![])).is_empty());
}

#[test]
fn test_no_filter_is_universe() {
    let all: BTreeSet<u32> = primary_keys(&catalog(), Query::new("Product")).into_iter().collect();
    assert_eq!(all, universe());
}

#[test]
fn test_primary_key_round_trip() {
    let found = primary_keys(
        &catalog(),
        Query::new("Product").filter(vec![FilterConstraint::primary_keys([3, 9, 5, 77])]),
    );
    assert_eq!(found, vec![3, 5, 9]);
}

#[test]
fn test_attribute_comparisons() {
    assert_eq!(
        keys(FilterConstraint::attribute_greater_than("priority", 100i64)),
        BTreeSet::from([11, 12])
    );
    assert_eq!(
        keys(FilterConstraint::attribute_between("priority", 30i64, 50i64)),
        BTreeSet::from([3, 4, 5])
    );
    assert_eq!(
        keys(FilterConstraint::attribute_in_set(
            "code",
            vec![Scalar::string("x"), Scalar::string("p1"), Scalar::string("zz")]
        )),
        BTreeSet::from([1, 7])
    );
}

// =============================================================================
// Properties
// =============================================================================

fn leaf() -> impl Strategy<Value = FilterConstraint> {
    prop_oneof![
        proptest::collection::btree_set(1u32..15, 0..8)
            .prop_map(|set| FilterConstraint::primary_keys(set)),
        (0i64..130).prop_map(|n| FilterConstraint::attribute_greater_than("priority", n)),
        (0i64..130).prop_map(|n| FilterConstraint::attribute_less_than("priority", n)),
    ]
}

fn tree() -> impl Strategy<Value = FilterConstraint> {
    leaf().prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..3).prop_map(FilterConstraint::and),
            proptest::collection::vec(inner.clone(), 0..3).prop_map(FilterConstraint::or),
            inner.prop_map(FilterConstraint::not),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_not_is_complement(x in tree()) {
        let matched = keys(x.clone());
        let negated = keys(FilterConstraint::not(x));
        prop_assert!(matched.is_disjoint(&negated));
        let union: BTreeSet<u32> = matched.union(&negated).copied().collect();
        prop_assert_eq!(union, universe());
    }

    #[test]
    fn prop_and_or_match_set_algebra(a in tree(), b in tree()) {
        let left = keys(a.clone());
        let right = keys(b.clone());
        let both = keys(FilterConstraint::and(vec![a.clone(), b.clone()]));
        let either = keys(FilterConstraint::or(vec![a, b]));
        prop_assert_eq!(both, left.intersection(&right).copied().collect::<BTreeSet<u32>>());
        prop_assert_eq!(either, left.union(&right).copied().collect::<BTreeSet<u32>>());
    }

    #[test]
    fn prop_single_child_is_identity(x in tree()) {
        let plain = keys(x.clone());
        prop_assert_eq!(keys(FilterConstraint::and(vec![x.clone()])), plain.clone());
        prop_assert_eq!(keys(FilterConstraint::or(vec![x])), plain);
    }
}
