//! Scalar values stored in attributes
//!
//! Values are strictly typed. Ordering is total and deterministic:
//! values of different kinds order by kind first (Bool < Int < Decimal <
//! String < DateTime < DateTimeRange < IntRange), same kinds by natural order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Language tag such as `en` or `cs-CZ`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Locale(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Locale::new(tag)
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Currency(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Currency::new(code)
    }
}

/// Inclusive validity interval, open ends are unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateTimeRange {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl DateTimeRange {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn until(to: DateTime<Utc>) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    /// Returns true if the instant lies within the interval
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| from <= *instant) && self.to.map_or(true, |to| *instant <= to)
    }
}

/// Inclusive integer interval, open ends are unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntRange {
    #[serde(default)]
    pub from: Option<i64>,
    #[serde(default)]
    pub to: Option<i64>,
}

impl IntRange {
    pub fn between(from: i64, to: i64) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.from.map_or(true, |from| from <= value) && self.to.map_or(true, |to| value <= to)
    }
}

/// Declared type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    Bool,
    Int,
    Decimal,
    String,
    DateTime,
    DateTimeRange,
    IntRange,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Bool => "bool",
            AttributeType::Int => "int",
            AttributeType::Decimal => "decimal",
            AttributeType::String => "string",
            AttributeType::DateTime => "dateTime",
            AttributeType::DateTimeRange => "dateTimeRange",
            AttributeType::IntRange => "intRange",
        }
    }

    /// Returns true for types a histogram can be computed over
    pub fn is_numeric(&self) -> bool {
        matches!(self, AttributeType::Int | AttributeType::Decimal)
    }

    /// Returns true for range types usable with `AttributeInRange`
    pub fn is_range(&self) -> bool {
        matches!(self, AttributeType::DateTimeRange | AttributeType::IntRange)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<Utc>),
    DateTimeRange(DateTimeRange),
    IntRange(IntRange),
}

impl Scalar {
    pub fn string(value: impl Into<String>) -> Self {
        Scalar::String(value.into())
    }

    /// Returns the type tag of this value
    pub fn ty(&self) -> AttributeType {
        match self {
            Scalar::Bool(_) => AttributeType::Bool,
            Scalar::Int(_) => AttributeType::Int,
            Scalar::Decimal(_) => AttributeType::Decimal,
            Scalar::String(_) => AttributeType::String,
            Scalar::DateTime(_) => AttributeType::DateTime,
            Scalar::DateTimeRange(_) => AttributeType::DateTimeRange,
            Scalar::IntRange(_) => AttributeType::IntRange,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric projection used by histograms
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Scalar::Int(i) => Some(Decimal::from(*i)),
            Scalar::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<Decimal> for Scalar {
    fn from(value: Decimal) -> Self {
        Scalar::Decimal(value)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(value: DateTime<Utc>) -> Self {
        Scalar::DateTime(value)
    }
}

/// Value of an attribute: a single scalar or an array of scalars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(Scalar),
    Array(Vec<Scalar>),
}

impl AttributeValue {
    /// Iterates the contained scalars (one for single values)
    pub fn scalars(&self) -> impl Iterator<Item = &Scalar> {
        let slice: &[Scalar] = match self {
            AttributeValue::Single(s) => std::slice::from_ref(s),
            AttributeValue::Array(values) => values,
        };
        slice.iter()
    }

    pub fn as_single(&self) -> Option<&Scalar> {
        match self {
            AttributeValue::Single(s) => Some(s),
            AttributeValue::Array(_) => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, AttributeValue::Array(_))
    }
}

impl From<Scalar> for AttributeValue {
    fn from(value: Scalar) -> Self {
        AttributeValue::Single(value)
    }
}

macro_rules! single_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttributeValue {
                fn from(value: $ty) -> Self {
                    AttributeValue::Single(Scalar::from(value))
                }
            }
        )*
    };
}

single_value_from!(&str, String, i64, bool, Decimal, DateTime<Utc>);

impl From<Vec<Scalar>> for AttributeValue {
    fn from(values: Vec<Scalar>) -> Self {
        AttributeValue::Array(values)
    }
}

/// Identity of an attribute or associated data value: name plus optional locale
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeKey {
    pub name: String,
    pub locale: Option<Locale>,
}

impl AttributeKey {
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: None,
        }
    }

    pub fn localized(name: impl Into<String>, locale: Locale) -> Self {
        Self {
            name: name.into(),
            locale: Some(locale),
        }
    }
}

/// Serialized form of one keyed value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedEntry<V> {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,
    pub value: V,
}

/// Keyed values (attributes or associated data) of an entity or a reference
///
/// Serialized as a list of `{name, locale?, value}` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    bound(serialize = "V: Serialize + Clone", deserialize = "V: Deserialize<'de>"),
    from = "Vec<KeyedEntry<V>>",
    into = "Vec<KeyedEntry<V>>"
)]
pub struct KeyedValues<V> {
    values: BTreeMap<AttributeKey, V>,
}

impl<V> Default for KeyedValues<V> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<V> KeyedValues<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: AttributeKey, value: V) {
        self.values.insert(key, value);
    }

    /// Builder-style insert of a non-localized value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<V>) -> Self {
        self.values.insert(AttributeKey::global(name), value.into());
        self
    }

    /// Builder-style insert of a localized value
    pub fn with_localized(
        mut self,
        name: impl Into<String>,
        locale: impl Into<Locale>,
        value: impl Into<V>,
    ) -> Self {
        self.values
            .insert(AttributeKey::localized(name, locale.into()), value.into());
        self
    }

    pub fn get(&self, key: &AttributeKey) -> Option<&V> {
        self.values.get(key)
    }

    /// Looks a value up by name, reading the localized variant when a locale is given
    pub fn lookup(&self, name: &str, locale: Option<&Locale>) -> Option<&V> {
        self.values.get(&AttributeKey {
            name: name.to_string(),
            locale: locale.cloned(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, &V)> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AttributeKey> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Locales carried by at least one localized value
    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.values.keys().filter_map(|k| k.locale.as_ref())
    }

    /// Keeps only entries matching the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&AttributeKey) -> bool) {
        self.values.retain(|k, _| keep(k));
    }
}

impl<V> From<Vec<KeyedEntry<V>>> for KeyedValues<V> {
    fn from(entries: Vec<KeyedEntry<V>>) -> Self {
        let mut values = BTreeMap::new();
        for entry in entries {
            values.insert(
                AttributeKey {
                    name: entry.name,
                    locale: entry.locale,
                },
                entry.value,
            );
        }
        Self { values }
    }
}

impl<V: Clone> From<KeyedValues<V>> for Vec<KeyedEntry<V>> {
    fn from(keyed: KeyedValues<V>) -> Self {
        keyed
            .values
            .into_iter()
            .map(|(key, value)| KeyedEntry {
                name: key.name,
                locale: key.locale,
                value,
            })
            .collect()
    }
}

/// Attributes of an entity or a reference
pub type Attributes = KeyedValues<AttributeValue>;

/// Associated data blobs of an entity (opaque JSON payloads)
pub type AssociatedData = KeyedValues<serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scalar_ordering_by_kind_then_value() {
        let mut values = vec![
            Scalar::string("b"),
            Scalar::Int(3),
            Scalar::Bool(true),
            Scalar::Int(-1),
            Scalar::string("a"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Scalar::Bool(true),
                Scalar::Int(-1),
                Scalar::Int(3),
                Scalar::string("a"),
                Scalar::string("b"),
            ]
        );
    }

    #[test]
    fn test_date_time_range_contains() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let range = DateTimeRange::between(from, to);

        assert!(range.contains(&from));
        assert!(range.contains(&to));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        assert!(DateTimeRange::since(from).contains(&Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_keyed_values_serde_as_entry_list() {
        let attrs = Attributes::new()
            .with("code", "x")
            .with_localized("name", "en", "Phone");

        let json = serde_json::to_value(&attrs).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 2);

        let back: Attributes = serde_json::from_value(json).unwrap();
        assert_eq!(back, attrs);
        assert_eq!(
            back.lookup("name", Some(&Locale::new("en"))),
            Some(&AttributeValue::from("Phone"))
        );
        assert_eq!(back.lookup("name", None), None);
    }

    #[test]
    fn test_attribute_value_array_scalars() {
        let value = AttributeValue::Array(vec![Scalar::Int(1), Scalar::Int(2)]);
        assert_eq!(value.scalars().count(), 2);
        assert!(value.as_single().is_none());
    }
}
