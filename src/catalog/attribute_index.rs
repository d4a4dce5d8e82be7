//! BTreeMap-based attribute index
//!
//! One sorted column per (attribute, locale) pair mapping each distinct
//! scalar to the bitmap of entities holding it. Array attributes index every
//! element, so any-element matching falls out of the bitmap union.

use std::collections::BTreeMap;
use std::ops::Bound;

use roaring::RoaringBitmap;

use super::index::{AttributeIndex, ScalarPredicate};
use super::value::{AttributeKey, AttributeValue, Locale, Scalar};

/// Sorted value → holders column of one attribute key
#[derive(Debug, Default, Clone)]
pub struct AttributeColumn {
    values: BTreeMap<Scalar, RoaringBitmap>,
    present: RoaringBitmap,
}

impl AttributeColumn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes the value for the entity (every element for arrays)
    pub fn insert(&mut self, primary_key: u32, value: &AttributeValue) {
        for scalar in value.scalars() {
            self.values
                .entry(scalar.clone())
                .or_default()
                .insert(primary_key);
        }
        self.present.insert(primary_key);
    }

    /// Holders of exactly this scalar
    pub fn lookup_eq(&self, key: &Scalar) -> RoaringBitmap {
        self.values.get(key).cloned().unwrap_or_default()
    }

    /// Holders of values within the bounds
    pub fn lookup_range(&self, from: Bound<&Scalar>, to: Bound<&Scalar>) -> RoaringBitmap {
        if let (Bound::Included(f) | Bound::Excluded(f), Bound::Included(t) | Bound::Excluded(t)) =
            (from, to)
        {
            if f > t {
                return RoaringBitmap::new();
            }
        }
        self.values
            .range::<Scalar, _>((from, to))
            .fold(RoaringBitmap::new(), |acc, (_, ids)| acc | ids)
    }

    /// Holders of any value matching the predicate; scans the column
    pub fn lookup_scan(&self, predicate: &ScalarPredicate) -> RoaringBitmap {
        self.values
            .iter()
            .filter(|(value, _)| predicate.matches(value))
            .fold(RoaringBitmap::new(), |acc, (_, ids)| acc | ids)
    }

    pub fn present(&self) -> &RoaringBitmap {
        &self.present
    }

    pub fn key_count(&self) -> usize {
        self.values.len()
    }

    fn lookup(&self, predicate: &ScalarPredicate) -> RoaringBitmap {
        // Range bounds stay within one scalar kind because kinds order first
        let kind_end = |v: &Scalar| self.values.range::<Scalar, _>((Bound::Excluded(v), Bound::Unbounded))
            .take_while(|(k, _)| std::mem::discriminant(*k) == std::mem::discriminant(v))
            .fold(RoaringBitmap::new(), |acc, (_, ids)| acc | ids);
        let kind_start = |v: &Scalar, inclusive: bool| {
            let upper = if inclusive { Bound::Included(v) } else { Bound::Excluded(v) };
            self.values
                .range::<Scalar, _>((Bound::Unbounded, upper))
                .rev()
                .take_while(|(k, _)| std::mem::discriminant(*k) == std::mem::discriminant(v))
                .fold(RoaringBitmap::new(), |acc, (_, ids)| acc | ids)
        };

        match predicate {
            ScalarPredicate::Equals(v) => self.lookup_eq(v),
            ScalarPredicate::GreaterThan(v) => kind_end(v),
            ScalarPredicate::GreaterThanEquals(v) => kind_end(v) | self.lookup_eq(v),
            ScalarPredicate::LessThan(v) => kind_start(v, false),
            ScalarPredicate::LessThanEquals(v) => kind_start(v, true),
            ScalarPredicate::Between(from, to) => {
                self.lookup_range(Bound::Included(from), Bound::Included(to))
            }
            ScalarPredicate::InSet(values) => values
                .iter()
                .fold(RoaringBitmap::new(), |acc, v| acc | self.lookup_eq(v)),
            ScalarPredicate::StartsWith(prefix) => {
                let start = Scalar::String(prefix.clone());
                self.values
                    .range::<Scalar, _>((Bound::Included(&start), Bound::Unbounded))
                    .take_while(|(k, _)| k.as_str().map_or(false, |s| s.starts_with(prefix.as_str())))
                    .fold(RoaringBitmap::new(), |acc, (_, ids)| acc | ids)
            }
            ScalarPredicate::IsNotNull => self.present.clone(),
            ScalarPredicate::EndsWith(_)
            | ScalarPredicate::Contains(_)
            | ScalarPredicate::InRange(_) => self.lookup_scan(predicate),
        }
    }
}

/// All attribute columns of one collection
#[derive(Debug, Default, Clone)]
pub struct MemoryAttributeIndex {
    columns: BTreeMap<AttributeKey, AttributeColumn>,
}

impl MemoryAttributeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &AttributeKey, primary_key: u32, value: &AttributeValue) {
        self.columns
            .entry(key.clone())
            .or_default()
            .insert(primary_key, value);
    }

    pub fn column(&self, key: &AttributeKey) -> Option<&AttributeColumn> {
        self.columns.get(key)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

impl AttributeIndex for MemoryAttributeIndex {
    fn lookup(
        &self,
        attribute: &str,
        locale: Option<&Locale>,
        predicate: &ScalarPredicate,
    ) -> RoaringBitmap {
        let key = AttributeKey {
            name: attribute.to_string(),
            locale: locale.cloned(),
        };
        self.columns
            .get(&key)
            .map(|column| column.lookup(predicate))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> MemoryAttributeIndex {
        let mut index = MemoryAttributeIndex::new();
        let key = AttributeKey::global("priority");
        for (pk, value) in [(1, 10), (2, 20), (3, 30), (4, 20)] {
            index.insert(&key, pk, &AttributeValue::from(value as i64));
        }
        let tags = AttributeKey::global("tags");
        index.insert(
            &tags,
            1,
            &AttributeValue::Array(vec![Scalar::string("new"), Scalar::string("sale")]),
        );
        index.insert(&tags, 2, &AttributeValue::Array(vec![Scalar::string("sale")]));
        index
    }

    fn ids(bitmap: RoaringBitmap) -> Vec<u32> {
        bitmap.iter().collect()
    }

    #[test]
    fn test_equality_and_ranges() {
        let index = index();
        let eq = index.lookup("priority", None, &ScalarPredicate::Equals(Scalar::Int(20)));
        assert_eq!(ids(eq), vec![2, 4]);

        let gt = index.lookup("priority", None, &ScalarPredicate::GreaterThan(Scalar::Int(10)));
        assert_eq!(ids(gt), vec![2, 3, 4]);

        let lte = index.lookup("priority", None, &ScalarPredicate::LessThanEquals(Scalar::Int(20)));
        assert_eq!(ids(lte), vec![1, 2, 4]);

        let between = index.lookup(
            "priority",
            None,
            &ScalarPredicate::Between(Scalar::Int(15), Scalar::Int(30)),
        );
        assert_eq!(ids(between), vec![2, 3, 4]);
    }

    #[test]
    fn test_inverted_between_is_empty() {
        let index = index();
        let between = index.lookup(
            "priority",
            None,
            &ScalarPredicate::Between(Scalar::Int(30), Scalar::Int(10)),
        );
        assert!(between.is_empty());
    }

    #[test]
    fn test_array_any_element() {
        let index = index();
        let sale = index.lookup("tags", None, &ScalarPredicate::Equals(Scalar::string("sale")));
        assert_eq!(ids(sale), vec![1, 2]);
        let new = index.lookup("tags", None, &ScalarPredicate::StartsWith("ne".into()));
        assert_eq!(ids(new), vec![1]);
    }

    #[test]
    fn test_unknown_column_is_empty() {
        let index = index();
        let result = index.lookup("missing", None, &ScalarPredicate::IsNotNull);
        assert!(result.is_empty());
    }
}
