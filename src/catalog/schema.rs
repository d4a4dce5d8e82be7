//! Collection schemas
//!
//! Schemas are supplied by the catalog owner and consumed read-only. The
//! evaluator uses them to validate queries before any evaluation happens.

use serde::{Deserialize, Serialize};

use super::value::{AttributeType, Locale};

fn default_true() -> bool {
    true
}

/// Attribute declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    /// Attribute holds an array of `ty` values
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub localized: bool,
    #[serde(default = "default_true")]
    pub filterable: bool,
    #[serde(default = "default_true")]
    pub sortable: bool,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            ty,
            array: false,
            localized: false,
            filterable: true,
            sortable: true,
        }
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self.sortable = false;
        self
    }

    pub fn not_sortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }
}

/// Associated data declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedDataSchema {
    pub name: String,
    #[serde(default)]
    pub localized: bool,
}

/// Bounds on the number of references of one kind an entity may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    ZeroOrOne,
    ExactlyOne,
    #[default]
    ZeroOrMore,
    OneOrMore,
}

impl Cardinality {
    pub fn allows(&self, count: usize) -> bool {
        match self {
            Cardinality::ZeroOrOne => count <= 1,
            Cardinality::ExactlyOne => count == 1,
            Cardinality::ZeroOrMore => true,
            Cardinality::OneOrMore => count >= 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::ZeroOrOne => "zeroOrOne",
            Cardinality::ExactlyOne => "exactlyOne",
            Cardinality::ZeroOrMore => "zeroOrMore",
            Cardinality::OneOrMore => "oneOrMore",
        }
    }
}

/// Reference declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSchema {
    pub name: String,
    /// Collection the reference points to
    pub referenced_entity_type: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    /// References of this kind are offered as facets
    #[serde(default)]
    pub faceted: bool,
    /// Collection of the facet group entities, if grouped
    #[serde(default)]
    pub group_type: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
}

impl ReferenceSchema {
    pub fn new(name: impl Into<String>, referenced_entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            referenced_entity_type: referenced_entity_type.into(),
            cardinality: Cardinality::ZeroOrMore,
            faceted: false,
            group_type: None,
            attributes: Vec::new(),
        }
    }

    pub fn faceted(mut self) -> Self {
        self.faceted = true;
        self
    }

    pub fn grouped_by(mut self, group_type: impl Into<String>) -> Self {
        self.group_type = Some(group_type.into());
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeSchema) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Schema of one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    pub name: String,
    /// Entities form a forest through their `parent` pointers
    #[serde(default)]
    pub with_hierarchy: bool,
    /// Attribute whose natural order sorts hierarchy siblings
    #[serde(default)]
    pub hierarchy_order_attribute: Option<String>,
    /// Primary keys are assigned by the engine instead of the caller
    #[serde(default)]
    pub generated_primary_key: bool,
    /// Locales allowed for localized values
    #[serde(default)]
    pub locales: Vec<Locale>,
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
    #[serde(default)]
    pub associated_data: Vec<AssociatedDataSchema>,
    #[serde(default)]
    pub references: Vec<ReferenceSchema>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            with_hierarchy: false,
            hierarchy_order_attribute: None,
            generated_primary_key: false,
            locales: Vec::new(),
            attributes: Vec::new(),
            associated_data: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn hierarchical(mut self) -> Self {
        self.with_hierarchy = true;
        self
    }

    pub fn ordered_by(mut self, attribute: impl Into<String>) -> Self {
        self.hierarchy_order_attribute = Some(attribute.into());
        self
    }

    pub fn with_generated_primary_key(mut self) -> Self {
        self.generated_primary_key = true;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<Locale>) -> Self {
        self.locales.push(locale.into());
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeSchema) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_associated_data(mut self, name: impl Into<String>, localized: bool) -> Self {
        self.associated_data.push(AssociatedDataSchema {
            name: name.into(),
            localized,
        });
        self
    }

    pub fn with_reference(mut self, reference: ReferenceSchema) -> Self {
        self.references.push(reference);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn associated_data(&self, name: &str) -> Option<&AssociatedDataSchema> {
        self.associated_data.iter().find(|a| a.name == name)
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceSchema> {
        self.references.iter().find(|r| r.name == name)
    }

    pub fn supports_locale(&self, locale: &Locale) -> bool {
        self.locales.contains(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_bounds() {
        assert!(Cardinality::ZeroOrOne.allows(0));
        assert!(!Cardinality::ZeroOrOne.allows(2));
        assert!(!Cardinality::ExactlyOne.allows(0));
        assert!(Cardinality::OneOrMore.allows(5));
        assert!(!Cardinality::OneOrMore.allows(0));
    }

    #[test]
    fn test_schema_deserialize_with_defaults() {
        let json = r#"{
            "name": "Product",
            "locales": ["en"],
            "attributes": [
                {"name": "code", "type": "string"},
                {"name": "name", "type": "string", "localized": true}
            ],
            "references": [
                {"name": "brand", "referencedEntityType": "Brand", "faceted": true}
            ]
        }"#;
        let schema: EntitySchema = serde_json::from_str(json).unwrap();

        assert!(!schema.with_hierarchy);
        assert!(schema.attribute("code").unwrap().filterable);
        assert!(schema.attribute("name").unwrap().localized);
        assert!(schema.reference("brand").unwrap().faceted);
        assert_eq!(
            schema.reference("brand").unwrap().cardinality,
            Cardinality::ZeroOrMore
        );
    }
}
