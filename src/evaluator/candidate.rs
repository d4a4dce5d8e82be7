//! Filtered candidate set with its selected prices

use std::collections::HashMap;

use roaring::RoaringBitmap;

use super::price::{PriceForSale, PriceResolver};

/// Result of filtering the queried collection
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    pub ids: RoaringBitmap,
    /// Selected price per candidate, filled only under a price context
    prices: HashMap<u32, PriceForSale>,
}

impl CandidateSet {
    pub fn new(ids: RoaringBitmap) -> Self {
        Self {
            ids,
            prices: HashMap::new(),
        }
    }

    /// Resolves the price for sale of every candidate once
    pub fn with_prices(mut self, resolver: &PriceResolver<'_>) -> Self {
        self.prices = self
            .ids
            .iter()
            .filter_map(|pk| resolver.selected(pk).map(|p| (pk, p)))
            .collect();
        self
    }

    pub fn len(&self) -> u64 {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn price_of(&self, primary_key: u32) -> Option<&PriceForSale> {
        self.prices.get(&primary_key)
    }

    pub fn priced(&self) -> impl Iterator<Item = (u32, &PriceForSale)> {
        self.ids
            .iter()
            .filter_map(move |pk| self.prices.get(&pk).map(|p| (pk, p)))
    }
}
