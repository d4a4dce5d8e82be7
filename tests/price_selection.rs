//! Price Selection Tests
//!
//! Tests for the price for sale of filtered entities:
//! - the first listed price list with an applicable price wins
//! - without price lists the cheapest applicable price wins
//! - `priceBetween` filters by the selected price only
//! - price ordering follows the selected price
//! - `priceType` switches every price comparison to prices with tax

mod common;

use catalogql::catalog::{CatalogSnapshot, Entity, EntitySchema, MemoryCatalog, Price, PriceType};
use catalogql::evaluator::EntityBody;
use catalogql::query::{
    EntityContent, EntityFetch, FilterConstraint, HistogramBehavior, OrderConstraint,
    OrderDirection, PriceContentMode, Query, RequireConstraint,
};

use common::{catalog, dec, evaluate, primary_keys};

// =============================================================================
// Helper Functions
// =============================================================================

fn fetch_one(filter: Vec<FilterConstraint>, content: Vec<EntityContent>) -> EntityBody {
    let query = Query::new("Product").filter(filter).require(vec![
        RequireConstraint::EntityFetch(EntityFetch::new(content)),
        RequireConstraint::Page { number: 1, size: 1 },
    ]);
    let response = evaluate(&catalog(), &query);
    response.records.data()[0].clone()
}

fn eur(lists: &[&str]) -> Vec<FilterConstraint> {
    vec![
        FilterConstraint::price_in_currency("EUR"),
        FilterConstraint::price_in_price_lists(lists.iter().copied()),
    ]
}

// =============================================================================
// Selection Tests
// =============================================================================

#[test]
fn test_first_listed_price_list_wins() {
    let mut filter = eur(&["sale", "basic"]);
    filter.push(FilterConstraint::primary_keys([2]));
    let body = fetch_one(filter, vec![EntityContent::AttributeContent(vec![])]);

    let price = body.price_for_sale.unwrap();
    assert_eq!(price.price_list, "sale");
    assert_eq!(price.price_without_tax, dec("92"));
    assert_eq!(price.price_id, Some(22));
}

#[test]
fn test_falls_back_to_later_price_list() {
    let mut filter = eur(&["sale", "basic"]);
    filter.push(FilterConstraint::primary_keys([3]));
    let body = fetch_one(filter, vec![EntityContent::AttributeContent(vec![])]);

    let price = body.price_for_sale.unwrap();
    assert_eq!(price.price_list, "basic");
    assert_eq!(price.price_without_tax, dec("103"));
}

#[test]
fn test_cheapest_without_price_lists() {
    let body = fetch_one(
        vec![FilterConstraint::price_in_currency("EUR"), FilterConstraint::primary_keys([4])],
        vec![EntityContent::AttributeContent(vec![])],
    );
    assert_eq!(body.price_for_sale.unwrap().price_without_tax, dec("94"));
}

#[test]
fn test_price_lists_filter_entities_without_applicable_price() {
    let found = primary_keys(&catalog(), Query::new("Product").filter(eur(&["sale"])));
    assert_eq!(found, vec![2, 4, 6, 8, 10, 12]);

    let none = primary_keys(
        &catalog(),
        Query::new("Product").filter(vec![FilterConstraint::price_in_currency("USD")]),
    );
    assert!(none.is_empty());
}

/// Product 2 sells for 92 although its basic price of 102 is in range.
#[test]
fn test_price_between_uses_selected_price() {
    let found = primary_keys(
        &catalog(),
        Query::new("Product").filter(vec![FilterConstraint::price_between(
            Some(dec("95")),
            Some(dec("101")),
        )]),
    );
    assert_eq!(found, vec![1, 6, 8, 10]);
}

// =============================================================================
// Price Content Tests
// =============================================================================

#[test]
fn test_price_content_all_and_respecting_filter() {
    let mut filter = eur(&["sale"]);
    filter.push(FilterConstraint::primary_keys([2]));

    let all = fetch_one(
        filter.clone(),
        vec![EntityContent::PriceContent {
            mode: PriceContentMode::All,
            additional_price_lists: vec![],
        }],
    );
    assert_eq!(all.prices.len(), 2);

    let respecting = fetch_one(
        filter,
        vec![EntityContent::PriceContent {
            mode: PriceContentMode::RespectingFilter,
            additional_price_lists: vec![],
        }],
    );
    let lists: Vec<&str> = respecting.prices.iter().map(|p| p.price_list.as_str()).collect();
    assert_eq!(lists, vec!["sale"]);
}

#[test]
fn test_no_price_for_sale_without_price_context() {
    let body = fetch_one(
        vec![FilterConstraint::primary_keys([2])],
        vec![EntityContent::AttributeContent(vec![])],
    );
    assert!(body.price_for_sale.is_none());
    assert!(body.prices.is_empty());
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_order_by_price_ascending() {
    let found = primary_keys(
        &catalog(),
        Query::new("Product").order(vec![OrderConstraint::price_natural(OrderDirection::Asc)]),
    );
    assert_eq!(found, vec![2, 4, 6, 8, 10, 1, 12, 3, 5, 7, 9, 11]);
}

#[test]
fn test_order_by_price_descending_within_lists() {
    let found = primary_keys(
        &catalog(),
        Query::new("Product")
            .filter(eur(&["basic"]))
            .order(vec![OrderConstraint::price_natural(OrderDirection::Desc)]),
    );
    assert_eq!(found, (1..=12).rev().collect::<Vec<u32>>());
}

// =============================================================================
// Price Type Tests
// =============================================================================

/// Net prices 100, 90, 95 with tax rates 0%, 25%, 10% gross up to 100, 112.5, 104.5.
fn taxed_catalog() -> MemoryCatalog {
    let taxed = [(1, "100", "0"), (2, "90", "25"), (3, "95", "10")]
        .into_iter()
        .map(|(pk, net, rate)| Entity::new(pk).with_price(Price::new(pk, "basic", "EUR", dec(net), dec(rate))))
        .collect();
    MemoryCatalog::from_snapshot(
        CatalogSnapshot::new().with_collection(EntitySchema::new("Product"), taxed),
    )
    .unwrap()
}

fn ascending(filter: Vec<FilterConstraint>, price_type: Option<PriceType>) -> Vec<u32> {
    let mut query = Query::new("Product")
        .filter(filter)
        .order(vec![OrderConstraint::price_natural(OrderDirection::Asc)]);
    if let Some(price_type) = price_type {
        query.require.constraints.push(RequireConstraint::PriceType(price_type));
    }
    primary_keys(&taxed_catalog(), query)
}

#[test]
fn test_price_type_drives_ordering() {
    assert_eq!(ascending(vec![], None), vec![2, 3, 1]);
    assert_eq!(ascending(vec![], Some(PriceType::WithTax)), vec![1, 3, 2]);
}

#[test]
fn test_price_type_drives_price_between() {
    let between = || vec![FilterConstraint::price_between(Some(dec("100")), Some(dec("105")))];
    assert_eq!(ascending(between(), None), vec![1]);
    assert_eq!(ascending(between(), Some(PriceType::WithTax)), vec![1, 3]);
}

#[test]
fn test_price_type_drives_histogram() {
    let query = Query::new("Product").require(vec![
        RequireConstraint::PriceType(PriceType::WithTax),
        RequireConstraint::PriceHistogram {
            bucket_count: 2,
            behavior: HistogramBehavior::Standard,
        },
    ]);
    let histogram = evaluate(&taxed_catalog(), &query).extra_results.price_histogram.unwrap();
    assert_eq!(histogram.min, dec("100"));
    assert_eq!(histogram.max, dec("112.5"));
    assert_eq!(histogram.overall_count, 3);
}
