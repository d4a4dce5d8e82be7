//! Entity bodies as held by the entity store

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value::{AssociatedData, Attributes, Currency, DateTimeRange, Locale};

/// Which price amount filtering, ordering and histograms read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceType {
    WithTax,
    #[default]
    WithoutTax,
}

/// How prices sharing an inner record id are combined into a price for sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceInnerRecordHandling {
    /// One price for sale, inner record ids are ignored
    #[default]
    None,
    /// Cheapest of the per-inner-record winners
    LowestPrice,
    /// Sum of the per-inner-record winners
    Sum,
}

fn default_sellable() -> bool {
    true
}

/// A single price record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub price_id: u32,
    pub price_list: String,
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_record_id: Option<u32>,
    pub price_without_tax: Decimal,
    pub tax_rate: Decimal,
    pub price_with_tax: Decimal,
    /// Missing validity means always valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<DateTimeRange>,
    #[serde(default = "default_sellable")]
    pub sellable: bool,
}

impl Price {
    pub fn new(
        price_id: u32,
        price_list: impl Into<String>,
        currency: impl Into<Currency>,
        price_without_tax: Decimal,
        tax_rate: Decimal,
    ) -> Self {
        let price_with_tax =
            (price_without_tax * (Decimal::ONE + tax_rate / Decimal::ONE_HUNDRED)).round_dp(2);
        Self {
            price_id,
            price_list: price_list.into(),
            currency: currency.into(),
            inner_record_id: None,
            price_without_tax,
            tax_rate,
            price_with_tax,
            validity: None,
            sellable: true,
        }
    }

    pub fn valid(mut self, validity: DateTimeRange) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn inner_record(mut self, inner_record_id: u32) -> Self {
        self.inner_record_id = Some(inner_record_id);
        self
    }

    pub fn not_sellable(mut self) -> Self {
        self.sellable = false;
        self
    }

    /// Amount read under the given price type
    pub fn amount(&self, price_type: PriceType) -> Decimal {
        match price_type {
            PriceType::WithTax => self.price_with_tax,
            PriceType::WithoutTax => self.price_without_tax,
        }
    }
}

/// A reference from an entity to another entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub name: String,
    pub referenced_primary_key: u32,
    /// Primary key of the facet group entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Reference {
    pub fn new(name: impl Into<String>, referenced_primary_key: u32) -> Self {
        Self {
            name: name.into(),
            referenced_primary_key,
            group: None,
            attributes: Attributes::new(),
        }
    }

    pub fn in_group(mut self, group: u32) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Full entity body
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Zero means "not assigned yet" for collections with generated keys
    #[serde(default)]
    pub primary_key: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub associated_data: AssociatedData,
    #[serde(default)]
    pub price_inner_record_handling: PriceInnerRecordHandling,
    #[serde(default)]
    pub prices: Vec<Price>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

impl Entity {
    pub fn new(primary_key: u32) -> Self {
        Self {
            primary_key,
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent: u32) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_associated_data(mut self, associated_data: AssociatedData) -> Self {
        self.associated_data = associated_data;
        self
    }

    pub fn with_price(mut self, price: Price) -> Self {
        self.prices.push(price);
        self
    }

    pub fn with_inner_record_handling(mut self, handling: PriceInnerRecordHandling) -> Self {
        self.price_inner_record_handling = handling;
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Locales the entity is "in": any localized attribute or associated data value
    pub fn locales(&self) -> BTreeSet<Locale> {
        self.attributes
            .locales()
            .chain(self.associated_data.locales())
            .cloned()
            .collect()
    }

    pub fn references_named(&self, name: &str) -> Vec<&Reference> {
        self.references.iter().filter(|r| r.name == name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn test_price_with_tax_computed() {
        let price = Price::new(1, "basic", "EUR", dec("100"), dec("21"));
        assert_eq!(price.price_with_tax, dec("121"));
        assert_eq!(price.amount(PriceType::WithoutTax), dec("100"));
        assert_eq!(price.amount(PriceType::WithTax), dec("121"));
    }

    #[test]
    fn test_entity_locales() {
        let entity = Entity::new(1).with_attributes(
            Attributes::new()
                .with("code", "a")
                .with_localized("name", "en", "A")
                .with_localized("name", "de", "A"),
        );
        let locales: Vec<_> = entity.locales().into_iter().map(|l| l.to_string()).collect();
        assert_eq!(locales, vec!["de", "en"]);
    }

    #[test]
    fn test_entity_deserialize_minimal() {
        let entity: Entity = serde_json::from_str(r#"{"primaryKey": 3}"#).unwrap();
        assert_eq!(entity.primary_key, 3);
        assert!(entity.prices.is_empty());
        assert_eq!(entity.price_inner_record_handling, PriceInnerRecordHandling::None);
    }
}
