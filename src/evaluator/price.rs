//! Price resolver
//!
//! Selects the single price for sale of an entity under the price context
//! gathered from the query filter:
//!
//! - a price is applicable when it is sellable, matches the currency, lies
//!   in one of the requested price lists and is valid at the instant
//! - the winner is the applicable price from the earliest listed price
//!   list; without price lists the cheapest applicable price wins
//! - `LowestPrice` and `Sum` entities pick one winner per inner record and
//!   combine the winners
//!
//! Remaining ties are broken by price id so selection is deterministic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use roaring::RoaringBitmap;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::catalog::{Currency, Price, PriceIndex, PriceInnerRecordHandling, PriceType};
use crate::query::{FilterBy, FilterConstraint};

/// Inclusive amount interval, open ends are unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceInterval {
    pub from: Option<Decimal>,
    pub to: Option<Decimal>,
}

impl PriceInterval {
    pub fn contains(&self, amount: Decimal) -> bool {
        self.from.map_or(true, |from| from <= amount) && self.to.map_or(true, |to| amount <= to)
    }
}

/// Price constraints of one query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PriceContext {
    pub currency: Option<Currency>,
    /// Priority order, first wins
    pub price_lists: Vec<String>,
    pub valid_at: Option<DateTime<Utc>>,
    pub between: Option<PriceInterval>,
}

impl PriceContext {
    /// Collects price constraints anywhere in the filter of the queried collection.
    ///
    /// Validation has already rejected differing currencies, validity
    /// instants and ranges, so the first occurrence of each is the only one.
    pub fn from_filter(filter_by: &FilterBy, now: DateTime<Utc>) -> Self {
        let mut context = PriceContext::default();
        filter_by.walk(&mut |c| match c {
            FilterConstraint::PriceInCurrency(currency) => {
                context.currency.get_or_insert_with(|| currency.clone());
            }
            FilterConstraint::PriceInPriceLists(lists) => {
                for list in lists {
                    if !context.price_lists.contains(list) {
                        context.price_lists.push(list.clone());
                    }
                }
            }
            FilterConstraint::PriceValidIn(instant) => {
                context.valid_at.get_or_insert(*instant);
            }
            FilterConstraint::PriceValidInNow => {
                context.valid_at.get_or_insert(now);
            }
            FilterConstraint::PriceBetween { from, to } => {
                context.between.get_or_insert(PriceInterval {
                    from: *from,
                    to: *to,
                });
            }
            _ => {}
        });
        context
    }

    /// True when the query constrains prices at all
    pub fn is_active(&self) -> bool {
        self.currency.is_some()
            || !self.price_lists.is_empty()
            || self.valid_at.is_some()
            || self.between.is_some()
    }

    fn rank(&self, price: &Price) -> Option<usize> {
        if self.price_lists.is_empty() {
            Some(0)
        } else {
            self.price_lists.iter().position(|l| *l == price.price_list)
        }
    }

    /// Applicability of one price record, ignoring the amount interval
    pub fn is_applicable(&self, price: &Price) -> bool {
        price.sellable
            && self.currency.as_ref().map_or(true, |c| *c == price.currency)
            && self.rank(price).is_some()
            && match (self.valid_at, &price.validity) {
                (Some(instant), Some(validity)) => validity.contains(&instant),
                _ => true,
            }
    }

    /// Currency and price list match, validity and sellability aside
    pub fn is_respected_by(&self, price: &Price, additional_lists: &[String]) -> bool {
        self.currency.as_ref().map_or(true, |c| *c == price.currency)
            && (self.price_lists.is_empty()
                || self.price_lists.contains(&price.price_list)
                || additional_lists.contains(&price.price_list))
    }
}

/// The price an entity is sold for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceForSale {
    pub price_list: String,
    pub currency: Currency,
    /// Absent for summed prices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_record_id: Option<u32>,
    pub price_without_tax: Decimal,
    pub price_with_tax: Decimal,
    /// Per inner record winners the price was combined from
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inner_records: Vec<Price>,
}

impl PriceForSale {
    fn single(price: &Price) -> Self {
        Self {
            price_list: price.price_list.clone(),
            currency: price.currency.clone(),
            price_id: Some(price.price_id),
            inner_record_id: price.inner_record_id,
            price_without_tax: price.price_without_tax,
            price_with_tax: price.price_with_tax,
            inner_records: Vec::new(),
        }
    }

    pub fn amount(&self, price_type: PriceType) -> Decimal {
        match price_type {
            PriceType::WithTax => self.price_with_tax,
            PriceType::WithoutTax => self.price_without_tax,
        }
    }
}

/// Resolves prices for sale of one collection
pub struct PriceResolver<'a> {
    index: &'a dyn PriceIndex,
    context: &'a PriceContext,
    price_type: PriceType,
}

impl<'a> PriceResolver<'a> {
    pub fn new(index: &'a dyn PriceIndex, context: &'a PriceContext, price_type: PriceType) -> Self {
        Self {
            index,
            context,
            price_type,
        }
    }

    pub fn price_type(&self) -> PriceType {
        self.price_type
    }

    /// Price for sale honouring the amount interval of the query, if any
    pub fn selected(&self, primary_key: u32) -> Option<PriceForSale> {
        self.resolve(primary_key, self.context.between.as_ref())
    }

    /// Price for sale without looking at the amount interval
    pub fn for_sale(&self, primary_key: u32) -> Option<PriceForSale> {
        self.resolve(primary_key, None)
    }

    /// Price for sale that falls into the interval
    pub fn for_sale_within(&self, primary_key: u32, interval: &PriceInterval) -> Option<PriceForSale> {
        self.resolve(primary_key, Some(interval))
    }

    /// Entities of `within` that have a price for sale
    pub fn sellable(&self, within: &RoaringBitmap) -> RoaringBitmap {
        self.filter(within, |pk| self.for_sale(pk).is_some())
    }

    /// Entities of `within` whose price for sale falls into the interval
    pub fn sellable_within(&self, within: &RoaringBitmap, interval: &PriceInterval) -> RoaringBitmap {
        self.filter(within, |pk| self.for_sale_within(pk, interval).is_some())
    }

    fn filter(&self, within: &RoaringBitmap, keep: impl Fn(u32) -> bool) -> RoaringBitmap {
        let holders = self
            .index
            .holders(self.context.currency.as_ref(), &self.context.price_lists);
        (holders & within).iter().filter(|pk| keep(*pk)).collect()
    }

    fn resolve(&self, primary_key: u32, interval: Option<&PriceInterval>) -> Option<PriceForSale> {
        let applicable: Vec<&Price> = self
            .index
            .prices_of(primary_key)
            .iter()
            .filter(|p| self.context.is_applicable(p))
            .collect();
        if applicable.is_empty() {
            return None;
        }
        let in_interval = |amount: Decimal| interval.map_or(true, |i| i.contains(amount));

        match self.index.inner_record_handling(primary_key) {
            PriceInnerRecordHandling::None => self
                .winner(applicable.iter().copied())
                .filter(|p| in_interval(p.amount(self.price_type)))
                .map(PriceForSale::single),
            PriceInnerRecordHandling::LowestPrice => {
                let winners = self.inner_record_winners(&applicable);
                let cheapest = winners
                    .iter()
                    .filter(|p| in_interval(p.amount(self.price_type)))
                    .min_by_key(|p| (p.amount(self.price_type), p.price_id))?;
                let mut sale = PriceForSale::single(cheapest);
                sale.inner_records = winners.into_iter().cloned().collect();
                Some(sale)
            }
            PriceInnerRecordHandling::Sum => {
                let winners = self.inner_record_winners(&applicable);
                let first = winners.first()?;
                let sale = PriceForSale {
                    price_list: first.price_list.clone(),
                    currency: first.currency.clone(),
                    price_id: None,
                    inner_record_id: None,
                    price_without_tax: winners.iter().map(|p| p.price_without_tax).sum(),
                    price_with_tax: winners.iter().map(|p| p.price_with_tax).sum(),
                    inner_records: winners.into_iter().cloned().collect(),
                };
                in_interval(sale.amount(self.price_type)).then_some(sale)
            }
        }
    }

    fn winner<'p>(&self, prices: impl Iterator<Item = &'p Price>) -> Option<&'p Price> {
        prices.min_by_key(|p| {
            (
                self.context.rank(p).unwrap_or(usize::MAX),
                p.amount(self.price_type),
                p.price_id,
            )
        })
    }

    fn inner_record_winners<'p>(&self, applicable: &[&'p Price]) -> Vec<&'p Price> {
        let mut groups: BTreeMap<Option<u32>, Vec<&'p Price>> = BTreeMap::new();
        for price in applicable {
            groups.entry(price.inner_record_id).or_default().push(price);
        }
        groups
            .into_values()
            .filter_map(|group| self.winner(group.into_iter()))
            .collect()
    }
}
