//! Entity body assembly
//!
//! Bodies carry only the content scopes the query asked for. A missing
//! `entityFetch` yields bare references (collection and primary key).
//! Localized values are limited to the query locale unless `dataInLocales`
//! widens them; referenced and group entities are fetched recursively with
//! their own nested fetch.

use std::collections::HashMap;

use serde::Serialize;

use super::candidate::CandidateSet;
use super::context::QueryContext;
use super::errors::{EvaluationError, EvaluationResult};
use super::filter::FilterEvaluator;
use super::order::OrderEvaluator;
use super::price::{PriceForSale, PriceResolver};
use crate::catalog::value::KeyedValues;
use crate::catalog::{
    AssociatedData, AttributeKey, Attributes, CollectionIndex, Entity, Locale, Price, Reference,
};
use crate::query::{EntityFetch, PriceContentMode, ReferenceContent, StopAt};

/// Fetched entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityBody {
    pub collection: String,
    pub primary_key: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    /// Ancestors from the root down to the parent
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<EntityBody>,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "AssociatedData::is_empty")]
    pub associated_data: AssociatedData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_for_sale: Option<PriceForSale>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<Price>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceBody>,
}

impl EntityBody {
    /// Body carrying the identity only
    pub fn reference(collection: &str, primary_key: u32) -> Self {
        Self {
            collection: collection.to_string(),
            primary_key,
            parent: None,
            parents: Vec::new(),
            attributes: Attributes::new(),
            associated_data: AssociatedData::new(),
            price_for_sale: None,
            prices: Vec::new(),
            references: Vec::new(),
        }
    }
}

/// Fetched reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceBody {
    pub name: String,
    pub referenced_primary_key: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_entity: Option<Box<EntityBody>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_entity: Option<Box<EntityBody>>,
}

/// Locales admitted into a body
enum LocaleScope<'l> {
    All,
    Only(Vec<&'l Locale>),
}

impl LocaleScope<'_> {
    fn admits(&self, key: &AttributeKey) -> bool {
        match (&key.locale, self) {
            (None, _) | (Some(_), LocaleScope::All) => true,
            (Some(locale), LocaleScope::Only(locales)) => locales.contains(&locale),
        }
    }
}

/// Builds entity bodies for the queried collection and, recursively, for
/// referenced collections
pub struct EntityFetcher<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    queried: &'a dyn CollectionIndex,
    candidates: Option<&'c CandidateSet>,
}

impl<'c, 'a> EntityFetcher<'c, 'a> {
    pub fn new(ctx: &'c QueryContext<'a>, queried: &'a dyn CollectionIndex) -> Self {
        Self {
            ctx,
            queried,
            candidates: None,
        }
    }

    /// Reuses prices already selected for the candidates
    pub fn with_prices(mut self, candidates: &'c CandidateSet) -> Self {
        self.candidates = Some(candidates);
        self
    }

    /// Body of an entity of a named collection, `None` when it does not exist
    pub fn fetch_in(
        &self,
        collection: &str,
        primary_key: u32,
        fetch: Option<&EntityFetch>,
    ) -> EvaluationResult<Option<EntityBody>> {
        let collection = self.ctx.collection(collection)?;
        self.fetch(collection, primary_key, fetch)
    }

    pub fn fetch(
        &self,
        collection: &'a dyn CollectionIndex,
        primary_key: u32,
        fetch: Option<&EntityFetch>,
    ) -> EvaluationResult<Option<EntityBody>> {
        let name = collection.schema().name.as_str();
        let Some(entity) = collection.entities().get(primary_key) else {
            return Ok(None);
        };
        let mut body = EntityBody::reference(name, primary_key);
        let Some(fetch) = fetch else {
            return Ok(Some(body));
        };
        let locales = self.locale_scope(fetch);

        if let Some(names) = fetch.attribute_names() {
            body.attributes = select(&entity.attributes, names, &locales);
        }
        if let Some(names) = fetch.associated_data_names() {
            body.associated_data = select(&entity.associated_data, names, &locales);
        }

        let is_queried = name == self.queried.schema().name;
        let price_content = fetch.price_content();
        if (is_queried && self.ctx.prices.is_active()) || price_content.is_some() {
            body.price_for_sale = self.price_for_sale(collection, primary_key, is_queried);
        }
        if let Some((mode, additional)) = price_content {
            body.prices = match mode {
                PriceContentMode::None => Vec::new(),
                PriceContentMode::RespectingFilter => entity
                    .prices
                    .iter()
                    .filter(|p| self.ctx.prices.is_respected_by(p, additional))
                    .cloned()
                    .collect(),
                PriceContentMode::All => entity.prices.clone(),
            };
        }

        if let Some((stop_at, parent_fetch)) = fetch.hierarchy_content() {
            body.parent = entity.parent;
            body.parents = self.parents(collection, entity, stop_at, parent_fetch)?;
        }

        for content in fetch.references() {
            body.references.extend(self.references(collection, entity, content, &locales)?);
        }
        Ok(Some(body))
    }

    fn locale_scope<'f>(&'f self, fetch: &'f EntityFetch) -> LocaleScope<'f> {
        let mut locales: Vec<&Locale> = self.ctx.locale.iter().collect();
        match fetch.data_in_locales() {
            Some([]) => LocaleScope::All,
            Some(extra) => {
                locales.extend(extra.iter().filter(|l| Some(*l) != self.ctx.locale.as_ref()));
                LocaleScope::Only(locales)
            }
            None => LocaleScope::Only(locales),
        }
    }

    fn price_for_sale(
        &self,
        collection: &'a dyn CollectionIndex,
        primary_key: u32,
        is_queried: bool,
    ) -> Option<PriceForSale> {
        if is_queried {
            if let Some(price) = self.candidates.and_then(|c| c.price_of(primary_key)) {
                return Some(price.clone());
            }
        }
        PriceResolver::new(collection.prices(), &self.ctx.prices, self.ctx.price_type)
            .for_sale(primary_key)
    }

    /// Ancestors of a hierarchical entity, root first
    fn parents(
        &self,
        collection: &'a dyn CollectionIndex,
        entity: &Entity,
        stop_at: Option<&StopAt>,
        fetch: Option<&EntityFetch>,
    ) -> EvaluationResult<Vec<EntityBody>> {
        let Some(tree) = collection.hierarchy() else {
            return Ok(Vec::new());
        };
        if !tree.contains(entity.primary_key) {
            return Ok(Vec::new());
        }
        let stop_nodes = match stop_at {
            Some(StopAt::Node(filter_by)) => Some(FilterEvaluator::new(self.ctx, collection).evaluate(filter_by)?),
            _ => None,
        };

        let mut chain = Vec::new();
        let mut current = tree.parent_of(entity.primary_key);
        let mut distance = 1u32;
        while let Some(pk) = current {
            match stop_at {
                Some(StopAt::Distance(max)) if distance > *max => break,
                Some(StopAt::Node(_)) if stop_nodes.as_ref().map_or(false, |s| s.contains(pk)) => break,
                // deeper ancestors are skipped, shallower ones stay
                Some(StopAt::Level(max)) if tree.level_of(pk).map_or(true, |l| l > *max as usize) => {}
                _ => chain.push(pk),
            }
            current = tree.parent_of(pk);
            distance += 1;
        }
        chain.reverse();

        chain
            .into_iter()
            .map(|pk| {
                self.fetch(collection, pk, fetch)?.ok_or_else(|| EvaluationError::SnapshotInconsistency {
                    collection: collection.schema().name.clone(),
                    primary_key: pk,
                })
            })
            .collect()
    }

    fn references(
        &self,
        collection: &'a dyn CollectionIndex,
        entity: &Entity,
        content: &ReferenceContent,
        locales: &LocaleScope<'_>,
    ) -> EvaluationResult<Vec<ReferenceBody>> {
        let schema = collection.schema();
        let mut bodies = Vec::new();
        for reference in schema.references.iter().filter(|r| content.includes(&r.name)) {
            let target_name = reference.referenced_entity_type.as_str();
            let mut held: Vec<&Reference> = entity.references_named(&reference.name);
            if held.is_empty() {
                continue;
            }

            let target = self.ctx.collection(target_name)?;
            if !content.filter_by.is_empty() {
                tracing::debug!(
                    reference = %reference.name,
                    collection = target_name,
                    "nested reference filter"
                );
                let admitted = FilterEvaluator::new(self.ctx, target)
                    .evaluate(&content.filter_by)
                    .map_err(|e| EvaluationError::nested(target_name, e))?;
                held.retain(|r| admitted.contains(r.referenced_primary_key));
            }
            if content.order_by.is_empty() {
                held.sort_by_key(|r| r.referenced_primary_key);
            } else {
                let ids = held.iter().map(|r| r.referenced_primary_key).collect();
                let order = OrderEvaluator::new(self.ctx, target).sort(&ids, &content.order_by, None);
                let positions: HashMap<u32, usize> = order.iter().enumerate().map(|(i, pk)| (*pk, i)).collect();
                held.sort_by_key(|r| positions.get(&r.referenced_primary_key).copied());
            }

            for held_reference in held {
                let referenced_entity = match &content.entity_fetch {
                    Some(nested) => self
                        .fetch(target, held_reference.referenced_primary_key, Some(nested))
                        .map_err(|e| EvaluationError::nested(target_name, e))?
                        .map(Box::new),
                    None => None,
                };
                let group_entity = match (&content.entity_group_fetch, held_reference.group, &reference.group_type) {
                    (Some(nested), Some(group), Some(group_type)) => self
                        .fetch_in(group_type, group, Some(nested))
                        .map_err(|e| EvaluationError::nested(group_type, e))?
                        .map(Box::new),
                    _ => None,
                };
                bodies.push(ReferenceBody {
                    name: reference.name.clone(),
                    referenced_primary_key: held_reference.referenced_primary_key,
                    group: held_reference.group,
                    attributes: match &content.attribute_content {
                        Some(names) => select(&held_reference.attributes, names, locales),
                        None => Attributes::new(),
                    },
                    referenced_entity,
                    group_entity,
                });
            }
        }
        Ok(bodies)
    }
}

/// Keyed values limited to the names (empty admits all) and locales
fn select<V: Clone>(
    values: &KeyedValues<V>,
    names: &[String],
    locales: &LocaleScope<'_>,
) -> KeyedValues<V> {
    let mut selected = values.clone();
    selected.retain(|key| (names.is_empty() || names.contains(&key.name)) && locales.admits(key));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        AttributeSchema, AttributeType, Catalog, CatalogSnapshot, EntitySchema, MemoryCatalog,
        ReferenceSchema,
    };
    use crate::evaluator::config::EvaluatorConfig;
    use crate::query::{EntityContent, FilterConstraint, Query};
    use rust_decimal::Decimal;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn catalog() -> MemoryCatalog {
        let products = EntitySchema::new("Product")
            .with_locale("en")
            .with_locale("de")
            .with_attribute(AttributeSchema::new("code", AttributeType::String))
            .with_attribute(AttributeSchema::new("name", AttributeType::String).localized())
            .with_associated_data("manual", false)
            .with_reference(
                ReferenceSchema::new("brand", "Brand")
                    .with_attribute(AttributeSchema::new("note", AttributeType::String)),
            );
        let product = Entity::new(1)
            .with_attributes(
                Attributes::new()
                    .with("code", "x")
                    .with_localized("name", "en", "Phone")
                    .with_localized("name", "de", "Telefon"),
            )
            .with_associated_data(AssociatedData::new().with("manual", serde_json::json!({"pages": 3})))
            .with_price(Price::new(1, "basic", "EUR", dec("10"), dec("0")))
            .with_price(Price::new(2, "sale", "EUR", dec("8"), dec("0")))
            .with_price(Price::new(3, "basic", "USD", dec("12"), dec("0")))
            .with_reference(
                Reference::new("brand", 20).with_attributes(Attributes::new().with("note", "b")),
            )
            .with_reference(Reference::new("brand", 10));
        let brands = EntitySchema::new("Brand")
            .with_attribute(AttributeSchema::new("title", AttributeType::String));
        let categories = EntitySchema::new("Category").hierarchical();
        MemoryCatalog::from_snapshot(
            CatalogSnapshot::new()
                .with_collection(products, vec![product])
                .with_collection(
                    brands,
                    vec![
                        Entity::new(10).with_attributes(Attributes::new().with("title", "Ten")),
                        Entity::new(20).with_attributes(Attributes::new().with("title", "Twenty")),
                    ],
                )
                .with_collection(
                    categories,
                    vec![
                        Entity::new(1),
                        Entity::new(2).with_parent(1),
                        Entity::new(3).with_parent(2),
                        Entity::new(4).with_parent(3),
                    ],
                ),
        )
        .unwrap()
    }

    fn fetched(catalog: &MemoryCatalog, query: &Query, collection: &str, pk: u32) -> EntityBody {
        let config = EvaluatorConfig::default();
        let locale = crate::query::query_locale(&query.filter_by).unwrap();
        let ctx = QueryContext::new(catalog, &config, query, locale);
        let queried = catalog.collection(&query.collection).unwrap();
        let fetcher = EntityFetcher::new(&ctx, queried);
        fetcher
            .fetch_in(collection, pk, query.require.entity_fetch())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_only_requested_attributes() {
        let catalog = catalog();
        let query = Query::new("Product").require(vec![crate::query::RequireConstraint::EntityFetch(
            EntityFetch::new(vec![EntityContent::AttributeContent(vec!["code".into()])]),
        )]);
        let body = fetched(&catalog, &query, "Product", 1);
        assert_eq!(body.attributes.len(), 1);
        assert!(body.associated_data.is_empty());
        assert!(body.price_for_sale.is_none());
        assert!(body.references.is_empty());
    }

    #[test]
    fn test_localized_values_follow_query_locale() {
        let catalog = catalog();
        let fetch = |content: Vec<EntityContent>| {
            Query::new("Product")
                .filter(vec![FilterConstraint::locale("en")])
                .require(vec![crate::query::RequireConstraint::EntityFetch(EntityFetch::new(content))])
        };
        let body = fetched(&catalog, &fetch(vec![EntityContent::AttributeContent(vec![])]), "Product", 1);
        assert_eq!(body.attributes.len(), 2);
        assert!(body.attributes.lookup("name", Some(&Locale::new("en"))).is_some());

        let widened = fetch(vec![
            EntityContent::AttributeContent(vec![]),
            EntityContent::DataInLocales(vec![Locale::new("de")]),
        ]);
        assert_eq!(fetched(&catalog, &widened, "Product", 1).attributes.len(), 3);
    }

    #[test]
    fn test_price_content_respecting_filter() {
        let catalog = catalog();
        let query = Query::new("Product")
            .filter(vec![
                FilterConstraint::price_in_currency("EUR"),
                FilterConstraint::price_in_price_lists(["sale", "basic"]),
            ])
            .require(vec![crate::query::RequireConstraint::EntityFetch(EntityFetch::new(vec![
                EntityContent::PriceContent {
                    mode: PriceContentMode::RespectingFilter,
                    additional_price_lists: vec![],
                },
            ]))]);
        let body = fetched(&catalog, &query, "Product", 1);
        assert_eq!(body.price_for_sale.unwrap().price_id, Some(2));
        let ids: Vec<u32> = body.prices.iter().map(|p| p.price_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_references_sorted_with_nested_entities() {
        let catalog = catalog();
        let content = ReferenceContent {
            attribute_content: Some(vec![]),
            ..ReferenceContent::named("brand").with_entity(EntityFetch::attributes())
        };
        let query = Query::new("Product").require(vec![crate::query::RequireConstraint::EntityFetch(
            EntityFetch::new(vec![EntityContent::ReferenceContent(content)]),
        )]);
        let body = fetched(&catalog, &query, "Product", 1);
        let targets: Vec<u32> = body.references.iter().map(|r| r.referenced_primary_key).collect();
        assert_eq!(targets, vec![10, 20]);
        let nested = body.references[0].referenced_entity.as_ref().unwrap();
        assert_eq!(nested.attributes.len(), 1);
        assert_eq!(body.references[1].attributes.len(), 1);
    }

    #[test]
    fn test_parents_with_stop_at_distance() {
        let catalog = catalog();
        let query = Query::new("Category").require(vec![crate::query::RequireConstraint::EntityFetch(
            EntityFetch::new(vec![EntityContent::HierarchyContent {
                stop_at: None,
                entity_fetch: None,
            }]),
        )]);
        let body = fetched(&catalog, &query, "Category", 4);
        let chain: Vec<u32> = body.parents.iter().map(|p| p.primary_key).collect();
        assert_eq!(chain, vec![1, 2, 3]);
        assert_eq!(body.parent, Some(3));

        let limited = Query::new("Category").require(vec![crate::query::RequireConstraint::EntityFetch(
            EntityFetch::new(vec![EntityContent::HierarchyContent {
                stop_at: Some(StopAt::Distance(2)),
                entity_fetch: None,
            }]),
        )]);
        let chain: Vec<u32> = fetched(&catalog, &limited, "Category", 4)
            .parents
            .iter()
            .map(|p| p.primary_key)
            .collect();
        assert_eq!(chain, vec![2, 3]);
    }
}
