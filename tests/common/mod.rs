//! Shared fixture catalog for the integration suites
//!
//! Products 1..=12:
//! - code `p{pk}`, except product 7 whose code is `x`
//! - priority `pk * 10`, localized name in `en` and `de`
//! - brand `10 + pk % 3`
//! - category: 1..=4 phones (2), 5..=6 smart (4), 7..=9 laptops (3),
//!   10..=12 garden (5)
//! - parameters: color red (200) for odd, blue (201) for even;
//!   size small (210) for 1..=6, large (211) for 7..=12
//! - prices in EUR: basic `100 + pk` for all, sale `90 + pk` for even
//!
//! Category forest: electronics (1) { phones (2) { smart (4) }, laptops (3) },
//! garden (5).

#![allow(dead_code)]

use catalogql::catalog::{
    AttributeSchema, AttributeType, Attributes, CatalogSnapshot, Entity, EntitySchema,
    MemoryCatalog, Price, Reference, ReferenceSchema,
};
use catalogql::evaluator::{EvaluationResponse, EvaluatorConfig, QueryEvaluator};
use catalogql::query::{Query, RequireConstraint};
use rust_decimal::Decimal;

pub const RED: u32 = 200;
pub const BLUE: u32 = 201;
pub const SMALL: u32 = 210;
pub const LARGE: u32 = 211;
pub const COLOR: u32 = 100;
pub const SIZE: u32 = 101;

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

fn category_of(pk: u32) -> u32 {
    match pk {
        1..=4 => 2,
        5..=6 => 4,
        7..=9 => 3,
        _ => 5,
    }
}

fn product(pk: u32) -> Entity {
    let code = if pk == 7 { "x".to_string() } else { format!("p{}", pk) };
    let mut entity = Entity::new(pk)
        .with_attributes(
            Attributes::new()
                .with("code", code)
                .with("priority", i64::from(pk) * 10)
                .with_localized("name", "en", format!("Product {}", pk))
                .with_localized("name", "de", format!("Produkt {}", pk)),
        )
        .with_price(Price::new(pk * 10 + 1, "basic", "EUR", Decimal::from(100 + pk), dec("0")))
        .with_reference(Reference::new("brand", 10 + pk % 3))
        .with_reference(Reference::new("categories", category_of(pk)))
        .with_reference(Reference::new("parameters", if pk % 2 == 1 { RED } else { BLUE }).in_group(COLOR))
        .with_reference(Reference::new("parameters", if pk <= 6 { SMALL } else { LARGE }).in_group(SIZE));
    if pk % 2 == 0 {
        entity = entity.with_price(Price::new(pk * 10 + 2, "sale", "EUR", Decimal::from(90 + pk), dec("0")));
    }
    entity
}

fn named(pk: u32, code: &str) -> Entity {
    Entity::new(pk).with_attributes(Attributes::new().with("code", code))
}

/// The fixture catalog before indexing
pub fn snapshot() -> CatalogSnapshot {
    let products = EntitySchema::new("Product")
        .with_locale("en")
        .with_locale("de")
        .with_attribute(AttributeSchema::new("code", AttributeType::String))
        .with_attribute(AttributeSchema::new("priority", AttributeType::Int))
        .with_attribute(AttributeSchema::new("name", AttributeType::String).localized())
        .with_reference(ReferenceSchema::new("brand", "Brand").faceted())
        .with_reference(ReferenceSchema::new("categories", "Category"))
        .with_reference(
            ReferenceSchema::new("parameters", "ParameterValue")
                .faceted()
                .grouped_by("Parameter"),
        );
    let code = || AttributeSchema::new("code", AttributeType::String);
    let categories = EntitySchema::new("Category").hierarchical().with_attribute(code());

    CatalogSnapshot::new()
        .with_collection(products, (1..=12).map(product).collect())
        .with_collection(
            categories,
            vec![
                named(1, "electronics"),
                named(2, "phones").with_parent(1),
                named(3, "laptops").with_parent(1),
                named(4, "smart").with_parent(2),
                named(5, "garden"),
            ],
        )
        .with_collection(
            EntitySchema::new("Brand").with_attribute(code()),
            vec![named(10, "acme"), named(11, "globex"), named(12, "initech")],
        )
        .with_collection(
            EntitySchema::new("Parameter").with_attribute(code()),
            vec![named(COLOR, "color"), named(SIZE, "size")],
        )
        .with_collection(
            EntitySchema::new("ParameterValue").with_attribute(code()),
            vec![
                named(RED, "red"),
                named(BLUE, "blue"),
                named(SMALL, "small"),
                named(LARGE, "large"),
            ],
        )
}

pub fn catalog() -> MemoryCatalog {
    MemoryCatalog::from_snapshot(snapshot()).unwrap()
}

/// A hierarchical collection with one root (1) and two children (2, 3)
pub fn menu_catalog() -> MemoryCatalog {
    let schema = EntitySchema::new("Menu").hierarchical();
    MemoryCatalog::from_snapshot(CatalogSnapshot::new().with_collection(
        schema,
        vec![Entity::new(1), Entity::new(2).with_parent(1), Entity::new(3).with_parent(1)],
    ))
    .unwrap()
}

pub fn evaluate(catalog: &MemoryCatalog, query: &Query) -> EvaluationResponse {
    QueryEvaluator::new(catalog, EvaluatorConfig::default().sequential())
        .evaluate(query)
        .unwrap()
}

/// Every matching primary key, in result order
pub fn primary_keys(catalog: &MemoryCatalog, query: Query) -> Vec<u32> {
    let mut query = query;
    query
        .require
        .constraints
        .retain(|c| !matches!(c, RequireConstraint::Page { .. } | RequireConstraint::Strip { .. }));
    query.require.constraints.push(RequireConstraint::Strip {
        offset: 0,
        limit: 1000,
    });
    evaluate(catalog, &query).records.primary_keys()
}
