//! Order evaluator
//!
//! Constraints apply as successive tie-breakers; the primary key ascending
//! breaks the remaining ties. Entities without a sort value follow every
//! entity that has one, whatever the direction. Random orders assign
//! unique ranks, so they decide the order on their own.

use std::cmp::Ordering;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use roaring::RoaringBitmap;
use rust_decimal::Decimal;

use super::candidate::CandidateSet;
use super::context::QueryContext;
use super::price::PriceResolver;
use crate::catalog::{Attributes, CollectionIndex, Locale, Scalar};
use crate::query::{FilterBy, FilterConstraint, OrderBy, OrderConstraint, OrderDirection};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Scalar(Scalar),
    Amount(Decimal),
    Position(usize),
}

/// Sort values of one constraint
struct Column {
    values: HashMap<u32, SortValue>,
    direction: OrderDirection,
}

impl Column {
    fn compare(&self, a: u32, b: u32) -> Ordering {
        match (self.values.get(&a), self.values.get(&b)) {
            (Some(x), Some(y)) => match self.direction {
                OrderDirection::Asc => x.cmp(y),
                OrderDirection::Desc => y.cmp(x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Orders primary keys of one collection
pub struct OrderEvaluator<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    collection: &'a dyn CollectionIndex,
    candidates: Option<&'c CandidateSet>,
}

impl<'c, 'a> OrderEvaluator<'c, 'a> {
    pub fn new(ctx: &'c QueryContext<'a>, collection: &'a dyn CollectionIndex) -> Self {
        Self {
            ctx,
            collection,
            candidates: None,
        }
    }

    /// Reuses prices already selected for the candidates
    pub fn with_prices(mut self, candidates: &'c CandidateSet) -> Self {
        self.candidates = Some(candidates);
        self
    }

    /// Sorted primary keys; `filter_by` feeds the `*InFilter` constraints
    pub fn sort(&self, ids: &RoaringBitmap, order_by: &OrderBy, filter_by: Option<&FilterBy>) -> Vec<u32> {
        let mut sorted: Vec<u32> = ids.iter().collect();
        if order_by.is_empty() {
            return sorted;
        }
        let columns: Vec<Column> = order_by
            .constraints
            .iter()
            .flat_map(|c| self.columns(c, &sorted, filter_by))
            .collect();
        sorted.sort_by(|a, b| {
            columns
                .iter()
                .map(|c| c.compare(*a, *b))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.cmp(b))
        });
        sorted
    }

    fn columns(&self, constraint: &OrderConstraint, ids: &[u32], filter_by: Option<&FilterBy>) -> Vec<Column> {
        let asc = |values| Column {
            values,
            direction: OrderDirection::Asc,
        };
        match constraint {
            OrderConstraint::AttributeNatural { name, direction } => {
                let locale = self.locale_of(name);
                vec![Column {
                    values: self.by_attribute(ids, |attributes| {
                        attributes
                            .lookup(name, locale)
                            .and_then(|v| v.as_single())
                            .map(|s| SortValue::Scalar(s.clone()))
                    }),
                    direction: *direction,
                }]
            }
            OrderConstraint::AttributeSetExact { name, values } => {
                vec![asc(self.by_position(ids, name, values))]
            }
            OrderConstraint::AttributeSetInFilter { name } => {
                let values = filter_by.and_then(|f| {
                    f.find(|c| matches!(c, FilterConstraint::AttributeInSet { name: n, .. } if n == name))
                });
                match values {
                    Some(FilterConstraint::AttributeInSet { values, .. }) => {
                        vec![asc(self.by_position(ids, name, values))]
                    }
                    _ => Vec::new(),
                }
            }
            OrderConstraint::PriceNatural { direction } => vec![Column {
                values: self.by_price(ids),
                direction: *direction,
            }],
            OrderConstraint::EntityPrimaryKeyNatural { direction } => vec![Column {
                values: ids.iter().map(|pk| (*pk, SortValue::Position(*pk as usize))).collect(),
                direction: *direction,
            }],
            OrderConstraint::EntityPrimaryKeyExact(keys) => vec![asc(key_positions(ids, keys))],
            OrderConstraint::EntityPrimaryKeyInFilter => {
                match filter_by.and_then(|f| f.find(|c| matches!(c, FilterConstraint::EntityPrimaryKeyInSet(_)))) {
                    Some(FilterConstraint::EntityPrimaryKeyInSet(keys)) => vec![asc(key_positions(ids, keys))],
                    _ => Vec::new(),
                }
            }
            OrderConstraint::Random => vec![asc(self.shuffled(ids, self.ctx.config.random_seed))],
            OrderConstraint::RandomWithSeed(seed) => vec![asc(self.shuffled(ids, Some(*seed)))],
            OrderConstraint::ReferenceProperty { name, order } => order
                .iter()
                .filter_map(|c| self.reference_column(ids, name, c))
                .collect(),
        }
    }

    fn locale_of(&self, attribute: &str) -> Option<&Locale> {
        let localized = self
            .collection
            .schema()
            .attribute(attribute)
            .map_or(false, |a| a.localized);
        self.ctx.locale_for(localized)
    }

    fn by_attribute(
        &self,
        ids: &[u32],
        value_of: impl Fn(&Attributes) -> Option<SortValue>,
    ) -> HashMap<u32, SortValue> {
        let store = self.collection.entities();
        ids.iter()
            .filter_map(|pk| {
                store
                    .get(*pk)
                    .and_then(|e| value_of(&e.attributes))
                    .map(|v| (*pk, v))
            })
            .collect()
    }

    fn by_position(&self, ids: &[u32], name: &str, values: &[Scalar]) -> HashMap<u32, SortValue> {
        let locale = self.locale_of(name);
        let mut positions: HashMap<&Scalar, usize> = HashMap::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            positions.entry(value).or_insert(i);
        }
        self.by_attribute(ids, |attributes| {
            let value = attributes.lookup(name, locale)?;
            value
                .scalars()
                .filter_map(|s| positions.get(s).copied())
                .min()
                .map(SortValue::Position)
        })
    }

    fn by_price(&self, ids: &[u32]) -> HashMap<u32, SortValue> {
        let price_type = self.ctx.price_type;
        match self.candidates {
            Some(candidates) => ids
                .iter()
                .filter_map(|pk| {
                    candidates
                        .price_of(*pk)
                        .map(|p| (*pk, SortValue::Amount(p.amount(price_type))))
                })
                .collect(),
            None => {
                let resolver = PriceResolver::new(self.collection.prices(), &self.ctx.prices, price_type);
                ids.iter()
                    .filter_map(|pk| {
                        resolver
                            .selected(*pk)
                            .map(|p| (*pk, SortValue::Amount(p.amount(price_type))))
                    })
                    .collect()
            }
        }
    }

    fn shuffled(&self, ids: &[u32], seed: Option<u64>) -> HashMap<u32, SortValue> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut permuted = ids.to_vec();
        permuted.shuffle(&mut rng);
        permuted
            .into_iter()
            .enumerate()
            .map(|(rank, pk)| (pk, SortValue::Position(rank)))
            .collect()
    }

    /// Column over the reference with the lowest referenced primary key
    fn reference_column(&self, ids: &[u32], reference: &str, constraint: &OrderConstraint) -> Option<Column> {
        let schema = self.collection.schema().reference(reference)?;
        let references = self.collection.references();
        let (name, direction) = match constraint {
            OrderConstraint::AttributeNatural { name, direction } => (name, *direction),
            OrderConstraint::EntityPrimaryKeyNatural { direction } => {
                let values = ids
                    .iter()
                    .filter_map(|pk| {
                        references
                            .references_of(*pk, reference)
                            .into_iter()
                            .map(|r| r.referenced_primary_key)
                            .min()
                            .map(|target| (*pk, SortValue::Position(target as usize)))
                    })
                    .collect();
                return Some(Column {
                    values,
                    direction: *direction,
                });
            }
            _ => return None,
        };
        let localized = schema.attribute(name).map_or(false, |a| a.localized);
        let locale = self.ctx.locale_for(localized);
        let values = ids
            .iter()
            .filter_map(|pk| {
                let first = references
                    .references_of(*pk, reference)
                    .into_iter()
                    .min_by_key(|r| r.referenced_primary_key)?;
                first
                    .attributes
                    .lookup(name, locale)
                    .and_then(|v| v.as_single())
                    .map(|s| (*pk, SortValue::Scalar(s.clone())))
            })
            .collect();
        Some(Column { values, direction })
    }
}

fn key_positions(ids: &[u32], keys: &[u32]) -> HashMap<u32, SortValue> {
    let mut positions: HashMap<u32, usize> = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        positions.entry(*key).or_insert(i);
    }
    ids.iter()
        .filter_map(|pk| positions.get(pk).map(|p| (*pk, SortValue::Position(*p))))
        .collect()
}
