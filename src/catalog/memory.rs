//! In-memory catalog built from a JSON snapshot
//!
//! Snapshot layout: `{ "collections": [ { "schema": {...}, "entities": [...] } ] }`.
//! Every entity is validated against its collection schema before any
//! index is built; the first violation aborts the whole load.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::entity::{Entity, Price, PriceInnerRecordHandling, Reference};
use super::errors::{CatalogError, CatalogResult};
use super::hierarchy::{HierarchyTree, Placement};
use super::index::{
    AttributeIndex, Catalog, CollectionIndex, EntityStore, FacetIndex, FacetKey, HierarchyIndex,
    PriceIndex, ReferenceIndex,
};
use super::attribute_index::MemoryAttributeIndex;
use super::schema::{AttributeSchema, EntitySchema};
use super::value::{AttributeValue, Attributes, Currency, Locale};

/// One collection of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub schema: EntitySchema,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// Serialized catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub collections: Vec<CollectionSnapshot>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, schema: EntitySchema, entities: Vec<Entity>) -> Self {
        self.collections.push(CollectionSnapshot { schema, entities });
        self
    }

    /// Reads a snapshot from a JSON file
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::InvalidSnapshot(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| CatalogError::InvalidSnapshot(format!("{}: {}", path.display(), e)))
    }
}

/// In-memory catalog
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    collections: BTreeMap<String, MemoryCollection>,
}

impl MemoryCatalog {
    /// Validates the snapshot and builds every index
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> CatalogResult<Self> {
        let mut collections = BTreeMap::new();
        for collection in snapshot.collections {
            let name = collection.schema.name.clone();
            if collections.contains_key(&name) {
                return Err(CatalogError::DuplicateCollection(name));
            }
            let built = MemoryCollection::build(collection.schema, collection.entities)?;
            collections.insert(name, built);
        }
        info!(collections = collections.len(), "catalog snapshot loaded");
        Ok(Self { collections })
    }

    pub fn load(path: &Path) -> CatalogResult<Self> {
        Self::from_snapshot(CatalogSnapshot::load(path)?)
    }
}

impl Catalog for MemoryCatalog {
    fn collection(&self, name: &str) -> Option<&dyn CollectionIndex> {
        self.collections
            .get(name)
            .map(|c| c as &dyn CollectionIndex)
    }

    fn collection_names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }
}

/// One collection with all of its indexes
#[derive(Debug)]
pub struct MemoryCollection {
    schema: EntitySchema,
    entities: BTreeMap<u32, Entity>,
    universe: RoaringBitmap,
    locales: BTreeMap<Locale, RoaringBitmap>,
    attributes: MemoryAttributeIndex,
    hierarchy: Option<HierarchyTree>,
    price_holders: BTreeMap<(Currency, String), RoaringBitmap>,
    referencing: HashMap<(String, u32), RoaringBitmap>,
    facets: BTreeMap<String, BTreeMap<FacetKey, RoaringBitmap>>,
}

impl MemoryCollection {
    pub fn build(schema: EntitySchema, mut entities: Vec<Entity>) -> CatalogResult<Self> {
        assign_primary_keys(&schema, &mut entities)?;

        let mut store = BTreeMap::new();
        let mut placements = Vec::new();
        for entity in entities {
            validate_entity(&schema, &entity)?;
            if store.contains_key(&entity.primary_key) {
                return Err(CatalogError::DuplicatePrimaryKey {
                    collection: schema.name.clone(),
                    primary_key: entity.primary_key,
                });
            }
            if schema.with_hierarchy {
                let order = schema
                    .hierarchy_order_attribute
                    .as_deref()
                    .and_then(|attr| entity.attributes.lookup(attr, None))
                    .and_then(AttributeValue::as_single)
                    .cloned();
                placements.push(Placement {
                    primary_key: entity.primary_key,
                    parent: entity.parent,
                    order,
                });
            }
            store.insert(entity.primary_key, entity);
        }

        let hierarchy = if schema.with_hierarchy {
            Some(HierarchyTree::build(&schema.name, placements)?)
        } else {
            None
        };

        let mut collection = Self {
            schema,
            entities: BTreeMap::new(),
            universe: RoaringBitmap::new(),
            locales: BTreeMap::new(),
            attributes: MemoryAttributeIndex::new(),
            hierarchy,
            price_holders: BTreeMap::new(),
            referencing: HashMap::new(),
            facets: BTreeMap::new(),
        };
        for (pk, entity) in &store {
            collection.index_entity(*pk, entity);
        }
        collection.entities = store;

        debug!(
            collection = %collection.schema.name,
            entities = collection.universe.len(),
            attribute_columns = collection.attributes.column_count(),
            "collection indexed"
        );
        Ok(collection)
    }

    fn index_entity(&mut self, pk: u32, entity: &Entity) {
        self.universe.insert(pk);
        for locale in entity.locales() {
            self.locales.entry(locale).or_default().insert(pk);
        }
        for (key, value) in entity.attributes.iter() {
            self.attributes.insert(key, pk, value);
        }
        for price in entity.prices.iter().filter(|p| p.sellable) {
            self.price_holders
                .entry((price.currency.clone(), price.price_list.clone()))
                .or_default()
                .insert(pk);
        }
        for reference in &entity.references {
            self.referencing
                .entry((reference.name.clone(), reference.referenced_primary_key))
                .or_default()
                .insert(pk);
            let faceted = self
                .schema
                .reference(&reference.name)
                .map_or(false, |r| r.faceted);
            if faceted {
                self.facets
                    .entry(reference.name.clone())
                    .or_default()
                    .entry(FacetKey {
                        group: reference.group,
                        primary_key: reference.referenced_primary_key,
                    })
                    .or_default()
                    .insert(pk);
            }
        }
    }
}

fn assign_primary_keys(schema: &EntitySchema, entities: &mut [Entity]) -> CatalogResult<()> {
    let mut next = entities.iter().map(|e| e.primary_key).max().unwrap_or(0);
    for entity in entities.iter_mut().filter(|e| e.primary_key == 0) {
        if !schema.generated_primary_key {
            return Err(CatalogError::PrimaryKeyPolicy {
                collection: schema.name.clone(),
                reason: "primary keys must be supplied by the caller".to_string(),
            });
        }
        next = next.checked_add(1).ok_or_else(|| CatalogError::PrimaryKeyPolicy {
            collection: schema.name.clone(),
            reason: "primary key space exhausted".to_string(),
        })?;
        entity.primary_key = next;
    }
    Ok(())
}

fn validate_attributes(
    schema: &EntitySchema,
    primary_key: u32,
    declared: &[AttributeSchema],
    attributes: &Attributes,
) -> CatalogResult<()> {
    for (key, value) in attributes.iter() {
        let attribute = declared
            .iter()
            .find(|a| a.name == key.name)
            .ok_or_else(|| CatalogError::undeclared(&schema.name, "attribute", &key.name))?;
        check_locale(schema, &key.name, attribute.localized, key.locale.as_ref())?;

        let shape_ok = attribute.array == value.is_array();
        if !shape_ok || value.scalars().any(|s| s.ty() != attribute.ty) {
            let found = match value {
                AttributeValue::Single(s) => s.ty().to_string(),
                AttributeValue::Array(values) => format!(
                    "array of [{}]",
                    values
                        .iter()
                        .map(|s| s.ty().as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            };
            let expected = if attribute.array {
                format!("array of {}", attribute.ty)
            } else {
                attribute.ty.to_string()
            };
            return Err(CatalogError::TypeMismatch {
                collection: schema.name.clone(),
                primary_key,
                attribute: key.name.clone(),
                expected,
                found,
            });
        }
    }
    Ok(())
}

fn check_locale(
    schema: &EntitySchema,
    name: &str,
    localized: bool,
    locale: Option<&Locale>,
) -> CatalogResult<()> {
    match (localized, locale) {
        (true, Some(locale)) if schema.supports_locale(locale) => Ok(()),
        (false, None) => Ok(()),
        (_, locale) => Err(CatalogError::LocaleNotAllowed {
            collection: schema.name.clone(),
            name: name.to_string(),
            locale: locale.map_or_else(|| "<none>".to_string(), |l| l.to_string()),
        }),
    }
}

fn validate_entity(schema: &EntitySchema, entity: &Entity) -> CatalogResult<()> {
    let pk = entity.primary_key;
    if entity.parent.is_some() && !schema.with_hierarchy {
        return Err(CatalogError::NotHierarchical {
            collection: schema.name.clone(),
            primary_key: pk,
        });
    }

    validate_attributes(schema, pk, &schema.attributes, &entity.attributes)?;

    for (key, _) in entity.associated_data.iter() {
        let declared = schema
            .associated_data(&key.name)
            .ok_or_else(|| CatalogError::undeclared(&schema.name, "associated data", &key.name))?;
        check_locale(schema, &key.name, declared.localized, key.locale.as_ref())?;
    }

    for reference in &entity.references {
        let declared = schema
            .reference(&reference.name)
            .ok_or_else(|| CatalogError::undeclared(&schema.name, "reference", &reference.name))?;
        validate_attributes(schema, pk, &declared.attributes, &reference.attributes)?;
    }
    for declared in &schema.references {
        let count = entity.references_named(&declared.name).len();
        if !declared.cardinality.allows(count) {
            return Err(CatalogError::Cardinality {
                collection: schema.name.clone(),
                primary_key: pk,
                reference: declared.name.clone(),
                count,
                cardinality: declared.cardinality.as_str().to_string(),
            });
        }
    }
    Ok(())
}

impl CollectionIndex for MemoryCollection {
    fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    fn entities(&self) -> &dyn EntityStore {
        self
    }

    fn attributes(&self) -> &dyn AttributeIndex {
        &self.attributes
    }

    fn hierarchy(&self) -> Option<&dyn HierarchyIndex> {
        self.hierarchy.as_ref().map(|h| h as &dyn HierarchyIndex)
    }

    fn prices(&self) -> &dyn PriceIndex {
        self
    }

    fn references(&self) -> &dyn ReferenceIndex {
        self
    }

    fn facets(&self) -> &dyn FacetIndex {
        self
    }
}

impl EntityStore for MemoryCollection {
    fn universe(&self) -> &RoaringBitmap {
        &self.universe
    }

    fn get(&self, primary_key: u32) -> Option<&Entity> {
        self.entities.get(&primary_key)
    }

    fn in_locale(&self, locale: &Locale) -> RoaringBitmap {
        self.locales.get(locale).cloned().unwrap_or_default()
    }
}

impl PriceIndex for MemoryCollection {
    fn prices_of(&self, primary_key: u32) -> &[Price] {
        self.entities
            .get(&primary_key)
            .map(|e| e.prices.as_slice())
            .unwrap_or(&[])
    }

    fn inner_record_handling(&self, primary_key: u32) -> PriceInnerRecordHandling {
        self.entities
            .get(&primary_key)
            .map(|e| e.price_inner_record_handling)
            .unwrap_or_default()
    }

    fn holders(&self, currency: Option<&Currency>, price_lists: &[String]) -> RoaringBitmap {
        self.price_holders
            .iter()
            .filter(|((c, list), _)| {
                currency.map_or(true, |wanted| wanted == c)
                    && (price_lists.is_empty() || price_lists.contains(list))
            })
            .fold(RoaringBitmap::new(), |acc, (_, ids)| acc | ids)
    }
}

impl ReferenceIndex for MemoryCollection {
    fn references_of(&self, primary_key: u32, reference: &str) -> Vec<&Reference> {
        self.entities
            .get(&primary_key)
            .map(|e| e.references_named(reference))
            .unwrap_or_default()
    }

    fn referencing(&self, reference: &str, target: u32) -> RoaringBitmap {
        self.referencing
            .get(&(reference.to_string(), target))
            .cloned()
            .unwrap_or_default()
    }
}

impl FacetIndex for MemoryCollection {
    fn facets_of(&self, reference: &str) -> Vec<(FacetKey, &RoaringBitmap)> {
        self.facets
            .get(reference)
            .map(|facets| facets.iter().map(|(k, ids)| (*k, ids)).collect())
            .unwrap_or_default()
    }

    fn holders_of(&self, reference: &str, primary_key: u32) -> RoaringBitmap {
        self.facets
            .get(reference)
            .map(|facets| {
                facets
                    .iter()
                    .filter(|(k, _)| k.primary_key == primary_key)
                    .fold(RoaringBitmap::new(), |acc, (_, ids)| acc | ids)
            })
            .unwrap_or_default()
    }
}
