//! Index collaborator interfaces
//!
//! The evaluator consumes a catalog only through these traits. Every
//! implementation must present a consistent, immutable snapshot for the
//! whole duration of a query. All lookups are synchronous.
//!
//! Identifiers handed across this boundary are primary keys; they double as
//! the dense ids stored in candidate bitmaps.

use roaring::RoaringBitmap;

use super::entity::{Entity, Price, PriceInnerRecordHandling, Reference};
use super::schema::EntitySchema;
use super::value::{Currency, Locale, Scalar};

/// Predicate an attribute index can answer directly
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarPredicate {
    Equals(Scalar),
    GreaterThan(Scalar),
    GreaterThanEquals(Scalar),
    LessThan(Scalar),
    LessThanEquals(Scalar),
    /// Inclusive on both ends
    Between(Scalar, Scalar),
    InSet(Vec<Scalar>),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    /// Range value contains the given point
    InRange(Scalar),
    IsNotNull,
}

impl ScalarPredicate {
    /// Evaluates the predicate against one stored scalar
    pub fn matches(&self, value: &Scalar) -> bool {
        match self {
            ScalarPredicate::Equals(v) => value == v,
            ScalarPredicate::GreaterThan(v) => same_kind(value, v) && value > v,
            ScalarPredicate::GreaterThanEquals(v) => same_kind(value, v) && value >= v,
            ScalarPredicate::LessThan(v) => same_kind(value, v) && value < v,
            ScalarPredicate::LessThanEquals(v) => same_kind(value, v) && value <= v,
            ScalarPredicate::Between(from, to) => {
                same_kind(value, from) && same_kind(value, to) && from <= value && value <= to
            }
            ScalarPredicate::InSet(values) => values.contains(value),
            ScalarPredicate::StartsWith(prefix) => {
                value.as_str().map_or(false, |s| s.starts_with(prefix.as_str()))
            }
            ScalarPredicate::EndsWith(suffix) => {
                value.as_str().map_or(false, |s| s.ends_with(suffix.as_str()))
            }
            ScalarPredicate::Contains(part) => {
                value.as_str().map_or(false, |s| s.contains(part.as_str()))
            }
            ScalarPredicate::InRange(point) => match (value, point) {
                (Scalar::IntRange(range), Scalar::Int(i)) => range.contains(*i),
                (Scalar::DateTimeRange(range), Scalar::DateTime(t)) => range.contains(t),
                _ => false,
            },
            ScalarPredicate::IsNotNull => true,
        }
    }
}

fn same_kind(a: &Scalar, b: &Scalar) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Catalog: the set of collections visible to one query
pub trait Catalog: Send + Sync {
    /// Returns the collection or `None` when it does not exist
    fn collection(&self, name: &str) -> Option<&dyn CollectionIndex>;

    /// Names of all collections, sorted
    fn collection_names(&self) -> Vec<String>;
}

/// All collaborators of one collection
pub trait CollectionIndex: Send + Sync {
    fn schema(&self) -> &EntitySchema;
    fn entities(&self) -> &dyn EntityStore;
    fn attributes(&self) -> &dyn AttributeIndex;
    /// Present only for hierarchical collections
    fn hierarchy(&self) -> Option<&dyn HierarchyIndex>;
    fn prices(&self) -> &dyn PriceIndex;
    fn references(&self) -> &dyn ReferenceIndex;
    fn facets(&self) -> &dyn FacetIndex;
}

/// Entity store: bodies by primary key
pub trait EntityStore: Send + Sync {
    /// Every primary key of the collection
    fn universe(&self) -> &RoaringBitmap;

    fn get(&self, primary_key: u32) -> Option<&Entity>;

    /// Entities carrying at least one localized value in the locale
    fn in_locale(&self, locale: &Locale) -> RoaringBitmap;
}

/// Attribute index
pub trait AttributeIndex: Send + Sync {
    /// Entities whose attribute value (any element for arrays) matches
    fn lookup(
        &self,
        attribute: &str,
        locale: Option<&Locale>,
        predicate: &ScalarPredicate,
    ) -> RoaringBitmap;
}

/// Hierarchy index over the forest of one hierarchical collection
///
/// Orphans (nodes whose parent chain never reaches a root) are not part
/// of the forest: `contains` is false for them.
pub trait HierarchyIndex: Send + Sync {
    /// Root nodes in sibling order
    fn roots(&self) -> Vec<u32>;

    fn contains(&self, primary_key: u32) -> bool;

    fn parent_of(&self, primary_key: u32) -> Option<u32>;

    /// Direct children in sibling order
    fn children_of(&self, primary_key: u32) -> Vec<u32>;

    /// Absolute depth, roots are on level 1
    fn level_of(&self, primary_key: u32) -> Option<usize>;
}

/// Price index
pub trait PriceIndex: Send + Sync {
    fn prices_of(&self, primary_key: u32) -> &[Price];

    fn inner_record_handling(&self, primary_key: u32) -> PriceInnerRecordHandling;

    /// Entities holding at least one sellable price in the currency / price lists
    fn holders(&self, currency: Option<&Currency>, price_lists: &[String]) -> RoaringBitmap;
}

/// Reference index
pub trait ReferenceIndex: Send + Sync {
    fn references_of(&self, primary_key: u32, reference: &str) -> Vec<&Reference>;

    /// Entities referencing the target through the named reference
    fn referencing(&self, reference: &str, target: u32) -> RoaringBitmap;
}

/// Identity of a facet inside one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FacetKey {
    pub group: Option<u32>,
    pub primary_key: u32,
}

/// Facet index: precomputed reverse mapping facet → holders
pub trait FacetIndex: Send + Sync {
    /// All facets of a reference with their holders
    fn facets_of(&self, reference: &str) -> Vec<(FacetKey, &RoaringBitmap)>;

    /// Holders of one facet, across all groups
    fn holders_of(&self, reference: &str, primary_key: u32) -> RoaringBitmap;
}
