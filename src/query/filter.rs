//! Filter constraints
//!
//! The filter part of a query is an immutable tree of [`FilterConstraint`]
//! variants. Rewrites used by the evaluator (stripping user filters, facet
//! selections or hierarchy scopes) never mutate a tree; they build a new one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Currency, Locale, Scalar};

/// Special values for `attributeIs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeSpecialValue {
    Null,
    NotNull,
}

/// Refinements of a hierarchy scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HierarchySpecification {
    /// Only depth-one relation to the anchor
    DirectRelation,
    /// Anchor itself is not part of the scope
    ExcludingRoot,
    /// Matching nodes and their subtrees leave the scope
    Excluding(Vec<FilterConstraint>),
    /// Every node on the root path must match
    Having(Vec<FilterConstraint>),
}

/// A single filter constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterConstraint {
    And(Vec<FilterConstraint>),
    Or(Vec<FilterConstraint>),
    Not(Box<FilterConstraint>),
    /// Optional narrowing chosen by the end user
    UserFilter(Vec<FilterConstraint>),

    AttributeEquals { name: String, value: Scalar },
    AttributeGreaterThan { name: String, value: Scalar },
    AttributeGreaterThanEquals { name: String, value: Scalar },
    AttributeLessThan { name: String, value: Scalar },
    AttributeLessThanEquals { name: String, value: Scalar },
    /// Inclusive; a missing bound is open
    AttributeBetween {
        name: String,
        #[serde(default)]
        from: Option<Scalar>,
        #[serde(default)]
        to: Option<Scalar>,
    },
    AttributeInSet { name: String, values: Vec<Scalar> },
    AttributeStartsWith { name: String, value: String },
    AttributeEndsWith { name: String, value: String },
    AttributeContains { name: String, value: String },
    AttributeEqualsTrue { name: String },
    AttributeEqualsFalse { name: String },
    AttributeIs { name: String, value: AttributeSpecialValue },
    /// Range attribute contains the point
    AttributeInRange { name: String, value: Scalar },
    AttributeInRangeNow { name: String },

    EntityPrimaryKeyInSet(Vec<u32>),
    EntityLocaleEquals(Locale),

    HierarchyWithin {
        #[serde(default)]
        reference: Option<String>,
        of: Box<FilterConstraint>,
        #[serde(default)]
        specification: Vec<HierarchySpecification>,
    },
    HierarchyWithinRoot {
        #[serde(default)]
        reference: Option<String>,
        #[serde(default)]
        specification: Vec<HierarchySpecification>,
    },

    PriceInCurrency(Currency),
    PriceInPriceLists(Vec<String>),
    PriceValidIn(DateTime<Utc>),
    PriceValidInNow,
    PriceBetween {
        #[serde(default)]
        from: Option<Decimal>,
        #[serde(default)]
        to: Option<Decimal>,
    },

    ReferenceHaving {
        name: String,
        #[serde(default)]
        filter: Vec<FilterConstraint>,
    },
    FacetHaving {
        name: String,
        #[serde(default)]
        filter: Vec<FilterConstraint>,
    },
    /// Predicate over the referenced entity, valid inside reference constraints
    EntityHaving(Vec<FilterConstraint>),
}

impl FilterConstraint {
    pub fn and(children: Vec<FilterConstraint>) -> Self {
        FilterConstraint::And(children)
    }

    pub fn or(children: Vec<FilterConstraint>) -> Self {
        FilterConstraint::Or(children)
    }

    pub fn not(child: FilterConstraint) -> Self {
        FilterConstraint::Not(Box::new(child))
    }

    pub fn user_filter(children: Vec<FilterConstraint>) -> Self {
        FilterConstraint::UserFilter(children)
    }

    pub fn attribute_equals(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        FilterConstraint::AttributeEquals {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn attribute_greater_than(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        FilterConstraint::AttributeGreaterThan {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn attribute_less_than(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        FilterConstraint::AttributeLessThan {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn attribute_between(
        name: impl Into<String>,
        from: impl Into<Scalar>,
        to: impl Into<Scalar>,
    ) -> Self {
        FilterConstraint::AttributeBetween {
            name: name.into(),
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    pub fn attribute_in_set(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        FilterConstraint::AttributeInSet {
            name: name.into(),
            values,
        }
    }

    pub fn attribute_starts_with(name: impl Into<String>, value: impl Into<String>) -> Self {
        FilterConstraint::AttributeStartsWith {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn attribute_contains(name: impl Into<String>, value: impl Into<String>) -> Self {
        FilterConstraint::AttributeContains {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn attribute_is_null(name: impl Into<String>) -> Self {
        FilterConstraint::AttributeIs {
            name: name.into(),
            value: AttributeSpecialValue::Null,
        }
    }

    pub fn attribute_is_not_null(name: impl Into<String>) -> Self {
        FilterConstraint::AttributeIs {
            name: name.into(),
            value: AttributeSpecialValue::NotNull,
        }
    }

    pub fn primary_keys(keys: impl IntoIterator<Item = u32>) -> Self {
        FilterConstraint::EntityPrimaryKeyInSet(keys.into_iter().collect())
    }

    pub fn locale(locale: impl Into<Locale>) -> Self {
        FilterConstraint::EntityLocaleEquals(locale.into())
    }

    /// Scope below nodes of the queried (hierarchical) collection itself
    pub fn hierarchy_within_self(
        of: FilterConstraint,
        specification: Vec<HierarchySpecification>,
    ) -> Self {
        FilterConstraint::HierarchyWithin {
            reference: None,
            of: Box::new(of),
            specification,
        }
    }

    /// Scope below nodes of a hierarchical collection targeted by a reference
    pub fn hierarchy_within(
        reference: impl Into<String>,
        of: FilterConstraint,
        specification: Vec<HierarchySpecification>,
    ) -> Self {
        FilterConstraint::HierarchyWithin {
            reference: Some(reference.into()),
            of: Box::new(of),
            specification,
        }
    }

    pub fn hierarchy_within_root_self(specification: Vec<HierarchySpecification>) -> Self {
        FilterConstraint::HierarchyWithinRoot {
            reference: None,
            specification,
        }
    }

    pub fn hierarchy_within_root(
        reference: impl Into<String>,
        specification: Vec<HierarchySpecification>,
    ) -> Self {
        FilterConstraint::HierarchyWithinRoot {
            reference: Some(reference.into()),
            specification,
        }
    }

    pub fn price_in_currency(currency: impl Into<Currency>) -> Self {
        FilterConstraint::PriceInCurrency(currency.into())
    }

    pub fn price_in_price_lists<S: Into<String>>(lists: impl IntoIterator<Item = S>) -> Self {
        FilterConstraint::PriceInPriceLists(lists.into_iter().map(Into::into).collect())
    }

    pub fn price_between(from: Option<Decimal>, to: Option<Decimal>) -> Self {
        FilterConstraint::PriceBetween { from, to }
    }

    pub fn reference_having(name: impl Into<String>, filter: Vec<FilterConstraint>) -> Self {
        FilterConstraint::ReferenceHaving {
            name: name.into(),
            filter,
        }
    }

    pub fn facet_having(name: impl Into<String>, filter: Vec<FilterConstraint>) -> Self {
        FilterConstraint::FacetHaving {
            name: name.into(),
            filter,
        }
    }

    /// Constraint name as written in a query
    pub fn name(&self) -> &'static str {
        match self {
            FilterConstraint::And(_) => "and",
            FilterConstraint::Or(_) => "or",
            FilterConstraint::Not(_) => "not",
            FilterConstraint::UserFilter(_) => "userFilter",
            FilterConstraint::AttributeEquals { .. } => "attributeEquals",
            FilterConstraint::AttributeGreaterThan { .. } => "attributeGreaterThan",
            FilterConstraint::AttributeGreaterThanEquals { .. } => "attributeGreaterThanEquals",
            FilterConstraint::AttributeLessThan { .. } => "attributeLessThan",
            FilterConstraint::AttributeLessThanEquals { .. } => "attributeLessThanEquals",
            FilterConstraint::AttributeBetween { .. } => "attributeBetween",
            FilterConstraint::AttributeInSet { .. } => "attributeInSet",
            FilterConstraint::AttributeStartsWith { .. } => "attributeStartsWith",
            FilterConstraint::AttributeEndsWith { .. } => "attributeEndsWith",
            FilterConstraint::AttributeContains { .. } => "attributeContains",
            FilterConstraint::AttributeEqualsTrue { .. } => "attributeEqualsTrue",
            FilterConstraint::AttributeEqualsFalse { .. } => "attributeEqualsFalse",
            FilterConstraint::AttributeIs { .. } => "attributeIs",
            FilterConstraint::AttributeInRange { .. } => "attributeInRange",
            FilterConstraint::AttributeInRangeNow { .. } => "attributeInRangeNow",
            FilterConstraint::EntityPrimaryKeyInSet(_) => "entityPrimaryKeyInSet",
            FilterConstraint::EntityLocaleEquals(_) => "entityLocaleEquals",
            FilterConstraint::HierarchyWithin { .. } => "hierarchyWithin",
            FilterConstraint::HierarchyWithinRoot { .. } => "hierarchyWithinRoot",
            FilterConstraint::PriceInCurrency(_) => "priceInCurrency",
            FilterConstraint::PriceInPriceLists(_) => "priceInPriceLists",
            FilterConstraint::PriceValidIn(_) => "priceValidIn",
            FilterConstraint::PriceValidInNow => "priceValidInNow",
            FilterConstraint::PriceBetween { .. } => "priceBetween",
            FilterConstraint::ReferenceHaving { .. } => "referenceHaving",
            FilterConstraint::FacetHaving { .. } => "facetHaving",
            FilterConstraint::EntityHaving(_) => "entityHaving",
        }
    }

    /// Attribute targeted by an attribute constraint
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            FilterConstraint::AttributeEquals { name, .. }
            | FilterConstraint::AttributeGreaterThan { name, .. }
            | FilterConstraint::AttributeGreaterThanEquals { name, .. }
            | FilterConstraint::AttributeLessThan { name, .. }
            | FilterConstraint::AttributeLessThanEquals { name, .. }
            | FilterConstraint::AttributeBetween { name, .. }
            | FilterConstraint::AttributeInSet { name, .. }
            | FilterConstraint::AttributeStartsWith { name, .. }
            | FilterConstraint::AttributeEndsWith { name, .. }
            | FilterConstraint::AttributeContains { name, .. }
            | FilterConstraint::AttributeEqualsTrue { name }
            | FilterConstraint::AttributeEqualsFalse { name }
            | FilterConstraint::AttributeIs { name, .. }
            | FilterConstraint::AttributeInRange { name, .. }
            | FilterConstraint::AttributeInRangeNow { name } => Some(name),
            _ => None,
        }
    }

    /// Children evaluated against the same collection as this node
    pub fn local_children(&self) -> &[FilterConstraint] {
        match self {
            FilterConstraint::And(children)
            | FilterConstraint::Or(children)
            | FilterConstraint::UserFilter(children) => children,
            FilterConstraint::Not(child) => std::slice::from_ref(child.as_ref()),
            _ => &[],
        }
    }

    /// Visits this node and every descendant in the same collection context
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a FilterConstraint)) {
        visit(self);
        for child in self.local_children() {
            child.walk(visit);
        }
    }

    /// Returns true if this node or a local descendant matches
    pub fn any(&self, predicate: &impl Fn(&FilterConstraint) -> bool) -> bool {
        predicate(self) || self.local_children().iter().any(|c| c.any(predicate))
    }

    /// Rebuilds the tree without nodes matching `remove`.
    ///
    /// Returns `None` when nothing constraining is left. A removed operand
    /// of `or` leaves the `or` unconstrained; a `not` over nothing is dropped.
    pub fn without(&self, remove: &impl Fn(&FilterConstraint) -> bool) -> Option<FilterConstraint> {
        if remove(self) {
            return None;
        }
        match self {
            FilterConstraint::And(children) => {
                let kept = prune_all(children, remove);
                (!kept.is_empty() || children.is_empty()).then(|| FilterConstraint::And(kept))
            }
            FilterConstraint::UserFilter(children) => {
                let kept = prune_all(children, remove);
                (!kept.is_empty() || children.is_empty()).then(|| FilterConstraint::UserFilter(kept))
            }
            FilterConstraint::Or(children) => {
                let mut kept = Vec::with_capacity(children.len());
                for child in children {
                    kept.push(child.without(remove)?);
                }
                Some(FilterConstraint::Or(kept))
            }
            FilterConstraint::Not(child) => child.without(remove).map(FilterConstraint::not),
            other => Some(other.clone()),
        }
    }
}

fn prune_all(
    children: &[FilterConstraint],
    remove: &impl Fn(&FilterConstraint) -> bool,
) -> Vec<FilterConstraint> {
    children.iter().filter_map(|c| c.without(remove)).collect()
}

/// The filter part of a query: children combine with an implicit `and`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterBy {
    pub constraints: Vec<FilterConstraint>,
}

impl FilterBy {
    pub fn new(constraints: Vec<FilterConstraint>) -> Self {
        Self { constraints }
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// The implicit `and` root
    pub fn root(&self) -> FilterConstraint {
        FilterConstraint::And(self.constraints.clone())
    }

    /// Visits every node in the queried collection's context
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a FilterConstraint)) {
        for constraint in &self.constraints {
            constraint.walk(visit);
        }
    }

    /// First node matching the predicate, depth first
    pub fn find(&self, mut predicate: impl FnMut(&FilterConstraint) -> bool) -> Option<&FilterConstraint> {
        let mut found = None;
        self.walk(&mut |c| {
            if found.is_none() && predicate(c) {
                found = Some(c);
            }
        });
        found
    }

    pub fn without(&self, remove: impl Fn(&FilterConstraint) -> bool) -> FilterBy {
        FilterBy::new(prune_all(&self.constraints, &remove))
    }

    /// Same filter with every `userFilter` removed
    pub fn without_user_filter(&self) -> FilterBy {
        self.without(|c| matches!(c, FilterConstraint::UserFilter(_)))
    }

    /// Same filter with facet selections removed (of one reference, or all)
    pub fn without_facets(&self, reference: Option<&str>) -> FilterBy {
        self.without(|c| match c {
            FilterConstraint::FacetHaving { name, .. } => reference.map_or(true, |r| r == name),
            _ => false,
        })
    }

    /// Same filter without hierarchy scoping (of one reference or of self)
    pub fn without_hierarchy_within(&self, reference: Option<&str>) -> FilterBy {
        self.without(|c| match c {
            FilterConstraint::HierarchyWithin { reference: r, .. }
            | FilterConstraint::HierarchyWithinRoot { reference: r, .. } => r.as_deref() == reference,
            _ => false,
        })
    }

    /// Locale selected by `entityLocaleEquals`, if any
    pub fn locales(&self) -> Vec<&Locale> {
        let mut locales = Vec::new();
        self.walk(&mut |c| {
            if let FilterConstraint::EntityLocaleEquals(locale) = c {
                if !locales.contains(&locale) {
                    locales.push(locale);
                }
            }
        });
        locales
    }
}
