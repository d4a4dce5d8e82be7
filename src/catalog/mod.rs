//! Catalog data model and index collaborators
//!
//! The evaluator sees a catalog only through the traits in [`index`].
//! [`MemoryCatalog`] is the in-memory implementation used by the CLI and
//! the test suites.

pub mod attribute_index;
pub mod entity;
pub mod errors;
pub mod hierarchy;
pub mod index;
pub mod memory;
pub mod schema;
pub mod value;

pub use entity::{Entity, Price, PriceInnerRecordHandling, PriceType, Reference};
pub use errors::{CatalogError, CatalogErrorCode, CatalogResult, Severity};
pub use hierarchy::HierarchyTree;
pub use index::{
    AttributeIndex, Catalog, CollectionIndex, EntityStore, FacetIndex, FacetKey, HierarchyIndex,
    PriceIndex, ReferenceIndex, ScalarPredicate,
};
pub use memory::{CatalogSnapshot, CollectionSnapshot, MemoryCatalog};
pub use schema::{AttributeSchema, Cardinality, EntitySchema, ReferenceSchema};
pub use value::{
    AssociatedData, AttributeKey, AttributeType, AttributeValue, Attributes, Currency,
    DateTimeRange, IntRange, Locale, Scalar,
};
