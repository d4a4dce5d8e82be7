//! Build-time query validation
//!
//! Checks names, literal types, locales and composition against the
//! catalog schemas before any evaluation happens. A query that passes
//! validation can only fail later on collaborator problems.

use std::collections::HashSet;

use super::errors::{QueryError, QueryResult};
use super::filter::{FilterBy, FilterConstraint, HierarchySpecification};
use super::order::{OrderBy, OrderConstraint};
use super::query::Query;
use super::require::{
    EntityContent, EntityFetch, FacetSummarySpec, HierarchyRequirement, RequireConstraint, StopAt,
};
use crate::catalog::{
    AttributeSchema, AttributeType, Catalog, EntitySchema, Locale, ReferenceSchema, Scalar,
};

/// Attribute owner a constraint is resolved against
#[derive(Clone, Copy)]
enum Target<'s> {
    Entity(&'s EntitySchema),
    Reference(&'s EntitySchema, &'s ReferenceSchema),
}

impl<'s> Target<'s> {
    fn attribute(&self, name: &str) -> QueryResult<&'s AttributeSchema> {
        let found = match self {
            Target::Entity(schema) => schema.attribute(name),
            Target::Reference(_, reference) => reference.attribute(name),
        };
        found.ok_or_else(|| QueryError::UnknownAttribute {
            collection: self.describe(),
            attribute: name.to_string(),
        })
    }

    fn describe(&self) -> String {
        match self {
            Target::Entity(schema) => schema.name.clone(),
            Target::Reference(schema, reference) => format!("{}.{}", schema.name, reference.name),
        }
    }
}

/// Validates queries against the schemas of a catalog
pub struct QueryValidator<'a> {
    catalog: &'a dyn Catalog,
    max_page_size: Option<usize>,
}

impl<'a> QueryValidator<'a> {
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self {
            catalog,
            max_page_size: None,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: Option<usize>) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Validates the whole query, returning the selected locale
    pub fn validate(&self, query: &Query) -> QueryResult<Option<Locale>> {
        let schema = self.schema(&query.collection)?;
        let locale = query_locale(&query.filter_by)?;
        price_constraints(&query.filter_by)?;
        let ctx = Ctx {
            validator: self,
            locale: locale.as_ref(),
        };

        ctx.filter_by(&query.filter_by, Target::Entity(schema), true)?;
        ctx.order_by(&query.order_by, Target::Entity(schema), Some(&query.filter_by))?;
        ctx.require(query, schema)?;
        Ok(locale)
    }

    fn schema(&self, collection: &str) -> QueryResult<&'a EntitySchema> {
        self.catalog
            .collection(collection)
            .map(|c| c.schema())
            .ok_or_else(|| QueryError::UnknownCollection(collection.to_string()))
    }
}

/// Locale selected by the filter; differing selections conflict
pub fn query_locale(filter_by: &FilterBy) -> QueryResult<Option<Locale>> {
    let locales = filter_by.locales();
    match locales.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some((*one).clone())),
        [first, second, ..] => Err(QueryError::ConflictingLocales(
            first.to_string(),
            second.to_string(),
        )),
    }
}

/// Currency, validity and price range may each be selected once.
///
/// Repeating an identical constraint is allowed; price lists merge.
pub fn price_constraints(filter_by: &FilterBy) -> QueryResult<()> {
    let mut currency: Option<&FilterConstraint> = None;
    let mut validity: Option<&FilterConstraint> = None;
    let mut between: Option<&FilterConstraint> = None;
    let mut conflict: Option<&'static str> = None;
    filter_by.walk(&mut |c| {
        let slot = match c {
            FilterConstraint::PriceInCurrency(_) => &mut currency,
            FilterConstraint::PriceValidIn(_) | FilterConstraint::PriceValidInNow => &mut validity,
            FilterConstraint::PriceBetween { .. } => &mut between,
            _ => return,
        };
        match *slot {
            Some(seen) if seen != c => {
                conflict.get_or_insert(c.name());
            }
            Some(_) => {}
            None => *slot = Some(c),
        }
    });
    match conflict {
        Some(name) => Err(QueryError::invalid(format!(
            "conflicting {} constraints in the filter",
            name
        ))),
        None => Ok(()),
    }
}

struct Ctx<'v, 'a> {
    validator: &'v QueryValidator<'a>,
    locale: Option<&'v Locale>,
}

impl<'v, 'a> Ctx<'v, 'a> {
    fn filter_by(&self, filter: &FilterBy, target: Target<'a>, root: bool) -> QueryResult<()> {
        for constraint in &filter.constraints {
            self.filter(constraint, target, root)?;
        }
        Ok(())
    }

    fn filters(&self, filters: &[FilterConstraint], target: Target<'a>) -> QueryResult<()> {
        for constraint in filters {
            self.filter(constraint, target, false)?;
        }
        Ok(())
    }

    fn filter(&self, constraint: &FilterConstraint, target: Target<'a>, root: bool) -> QueryResult<()> {
        match constraint {
            FilterConstraint::And(children) | FilterConstraint::Or(children) => {
                for child in children {
                    self.filter(child, target, root)?;
                }
                Ok(())
            }
            FilterConstraint::Not(child) => self.filter(child, target, root),
            FilterConstraint::UserFilter(children) => {
                if !root {
                    return Err(QueryError::invalid(
                        "userFilter is allowed only in the filter of the queried collection",
                    ));
                }
                if children
                    .iter()
                    .any(|c| c.any(&|n| matches!(n, FilterConstraint::UserFilter(_))))
                {
                    return Err(QueryError::invalid("userFilter cannot be nested"));
                }
                for child in children {
                    self.filter(child, target, root)?;
                }
                Ok(())
            }
            FilterConstraint::AttributeEquals { name, value }
            | FilterConstraint::AttributeGreaterThan { name, value }
            | FilterConstraint::AttributeGreaterThanEquals { name, value }
            | FilterConstraint::AttributeLessThan { name, value }
            | FilterConstraint::AttributeLessThanEquals { name, value } => {
                let attribute = self.filterable(target, name)?;
                check_literal(constraint.name(), attribute, attribute.ty, value)
            }
            FilterConstraint::AttributeBetween { name, from, to } => {
                let attribute = self.filterable(target, name)?;
                if from.is_none() && to.is_none() {
                    return Err(QueryError::invalid(format!(
                        "attributeBetween on `{}` needs at least one bound",
                        name
                    )));
                }
                for bound in from.iter().chain(to.iter()) {
                    check_literal(constraint.name(), attribute, attribute.ty, bound)?;
                }
                Ok(())
            }
            FilterConstraint::AttributeInSet { name, values } => {
                let attribute = self.filterable(target, name)?;
                for value in values {
                    check_literal(constraint.name(), attribute, attribute.ty, value)?;
                }
                Ok(())
            }
            FilterConstraint::AttributeStartsWith { name, .. }
            | FilterConstraint::AttributeEndsWith { name, .. }
            | FilterConstraint::AttributeContains { name, .. } => {
                let attribute = self.filterable(target, name)?;
                require_type(constraint.name(), attribute, &[AttributeType::String])
            }
            FilterConstraint::AttributeEqualsTrue { name }
            | FilterConstraint::AttributeEqualsFalse { name } => {
                let attribute = self.filterable(target, name)?;
                require_type(constraint.name(), attribute, &[AttributeType::Bool])
            }
            FilterConstraint::AttributeIs { name, .. } => self.filterable(target, name).map(|_| ()),
            FilterConstraint::AttributeInRange { name, value } => {
                let attribute = self.filterable(target, name)?;
                let point = match attribute.ty {
                    AttributeType::IntRange => AttributeType::Int,
                    AttributeType::DateTimeRange => AttributeType::DateTime,
                    _ => {
                        return require_type(
                            constraint.name(),
                            attribute,
                            &[AttributeType::IntRange, AttributeType::DateTimeRange],
                        )
                    }
                };
                check_literal(constraint.name(), attribute, point, value)
            }
            FilterConstraint::AttributeInRangeNow { name } => {
                let attribute = self.filterable(target, name)?;
                require_type(constraint.name(), attribute, &[AttributeType::DateTimeRange])
            }
            FilterConstraint::EntityPrimaryKeyInSet(_) => Ok(()),
            FilterConstraint::EntityLocaleEquals(_)
            | FilterConstraint::PriceInCurrency(_)
            | FilterConstraint::PriceInPriceLists(_)
            | FilterConstraint::PriceValidIn(_)
            | FilterConstraint::PriceValidInNow
            | FilterConstraint::PriceBetween { .. } => match target {
                Target::Entity(_) if root => Ok(()),
                _ => Err(QueryError::invalid(format!(
                    "{} applies only to the queried collection",
                    constraint.name()
                ))),
            },
            FilterConstraint::HierarchyWithin {
                reference,
                of,
                specification,
            } => {
                let hierarchy = self.hierarchy_target(target, reference.as_deref(), root)?;
                self.filter(of, Target::Entity(hierarchy), false)?;
                self.specification(specification, hierarchy)
            }
            FilterConstraint::HierarchyWithinRoot {
                reference,
                specification,
            } => {
                let hierarchy = self.hierarchy_target(target, reference.as_deref(), root)?;
                self.specification(specification, hierarchy)
            }
            FilterConstraint::ReferenceHaving { name, filter }
            | FilterConstraint::FacetHaving { name, filter } => {
                let Target::Entity(schema) = target else {
                    return Err(QueryError::invalid(format!(
                        "{} cannot be nested inside another reference constraint",
                        constraint.name()
                    )));
                };
                let reference = reference_schema(schema, name)?;
                if matches!(constraint, FilterConstraint::FacetHaving { .. }) && !reference.faceted {
                    return Err(QueryError::NotFaceted {
                        collection: schema.name.clone(),
                        reference: name.clone(),
                    });
                }
                self.filters(filter, Target::Reference(schema, reference))
            }
            FilterConstraint::EntityHaving(filter) => {
                let Target::Reference(_, reference) = target else {
                    return Err(QueryError::invalid(
                        "entityHaving is allowed only inside referenceHaving or facetHaving",
                    ));
                };
                let referenced = self.validator.schema(&reference.referenced_entity_type)?;
                self.filters(filter, Target::Entity(referenced))
            }
        }
    }

    fn filterable(&self, target: Target<'a>, name: &str) -> QueryResult<&'a AttributeSchema> {
        let attribute = target.attribute(name)?;
        if !attribute.filterable {
            return Err(QueryError::NotFilterable {
                collection: target.describe(),
                attribute: name.to_string(),
            });
        }
        self.localized(attribute)?;
        Ok(attribute)
    }

    fn localized(&self, attribute: &AttributeSchema) -> QueryResult<()> {
        if attribute.localized && self.locale.is_none() {
            return Err(QueryError::MissingLocale {
                attribute: attribute.name.clone(),
            });
        }
        Ok(())
    }

    fn hierarchy_target(
        &self,
        target: Target<'a>,
        reference: Option<&str>,
        root: bool,
    ) -> QueryResult<&'a EntitySchema> {
        let Target::Entity(schema) = target else {
            return Err(QueryError::invalid(
                "hierarchy scoping is not allowed inside reference constraints",
            ));
        };
        if !root {
            return Err(QueryError::invalid(
                "hierarchy scoping applies only to the queried collection",
            ));
        }
        let hierarchy = match reference {
            None => schema,
            Some(name) => {
                let reference = reference_schema(schema, name)?;
                self.validator.schema(&reference.referenced_entity_type)?
            }
        };
        if !hierarchy.with_hierarchy {
            return Err(QueryError::NotHierarchical(hierarchy.name.clone()));
        }
        Ok(hierarchy)
    }

    fn specification(
        &self,
        specification: &[HierarchySpecification],
        hierarchy: &'a EntitySchema,
    ) -> QueryResult<()> {
        for spec in specification {
            match spec {
                HierarchySpecification::DirectRelation | HierarchySpecification::ExcludingRoot => {}
                HierarchySpecification::Excluding(filter) | HierarchySpecification::Having(filter) => {
                    self.filters(filter, Target::Entity(hierarchy))?
                }
            }
        }
        Ok(())
    }

    fn order_by(
        &self,
        order: &OrderBy,
        target: Target<'a>,
        filter: Option<&FilterBy>,
    ) -> QueryResult<()> {
        for constraint in &order.constraints {
            self.order(constraint, target, filter)?;
        }
        Ok(())
    }

    fn order(
        &self,
        constraint: &OrderConstraint,
        target: Target<'a>,
        filter: Option<&FilterBy>,
    ) -> QueryResult<()> {
        match constraint {
            OrderConstraint::AttributeNatural { name, .. } => {
                let attribute = target.attribute(name)?;
                if !attribute.sortable || attribute.array {
                    return Err(QueryError::NotSortable {
                        collection: target.describe(),
                        attribute: name.clone(),
                    });
                }
                self.localized(attribute)
            }
            OrderConstraint::AttributeSetExact { name, values } => {
                let attribute = target.attribute(name)?;
                self.localized(attribute)?;
                for value in values {
                    check_literal(constraint.name(), attribute, attribute.ty, value)?;
                }
                Ok(())
            }
            OrderConstraint::AttributeSetInFilter { name } => {
                let attribute = target.attribute(name)?;
                self.localized(attribute)?;
                let present = filter.and_then(|f| {
                    f.find(|c| matches!(c, FilterConstraint::AttributeInSet { name: n, .. } if n == name))
                });
                present.map(|_| ()).ok_or(QueryError::MissingFilterForOrder {
                    constraint: "attributeSetInFilter",
                    filter: "attributeInSet",
                })
            }
            OrderConstraint::EntityPrimaryKeyInFilter => {
                let present = filter.and_then(|f| {
                    f.find(|c| matches!(c, FilterConstraint::EntityPrimaryKeyInSet(_)))
                });
                present.map(|_| ()).ok_or(QueryError::MissingFilterForOrder {
                    constraint: "entityPrimaryKeyInFilter",
                    filter: "entityPrimaryKeyInSet",
                })
            }
            OrderConstraint::PriceNatural { .. } => match target {
                Target::Entity(_) => Ok(()),
                Target::Reference(..) => Err(QueryError::invalid(
                    "priceNatural cannot order by reference properties",
                )),
            },
            OrderConstraint::EntityPrimaryKeyNatural { .. }
            | OrderConstraint::EntityPrimaryKeyExact(_)
            | OrderConstraint::Random
            | OrderConstraint::RandomWithSeed(_) => Ok(()),
            OrderConstraint::ReferenceProperty { name, order } => {
                let Target::Entity(schema) = target else {
                    return Err(QueryError::invalid("referenceProperty cannot be nested"));
                };
                let reference = reference_schema(schema, name)?;
                self.order_by(
                    &OrderBy::new(order.clone()),
                    Target::Reference(schema, reference),
                    None,
                )
            }
        }
    }

    fn require(&self, query: &Query, schema: &'a EntitySchema) -> QueryResult<()> {
        let mut slices = 0;
        for constraint in &query.require.constraints {
            match constraint {
                RequireConstraint::Page { number, size } => {
                    slices += 1;
                    if *number == 0 {
                        return Err(QueryError::invalid("page numbers start at 1"));
                    }
                    self.page_size(*size)?;
                }
                RequireConstraint::Strip { limit, .. } => {
                    slices += 1;
                    self.page_size(*limit)?;
                }
                RequireConstraint::EntityFetch(fetch) => self.entity_fetch(fetch, schema)?,
                RequireConstraint::FacetSummary(spec) => {
                    for reference in schema.references.iter().filter(|r| r.faceted) {
                        self.facet_summary(spec, schema, reference)?;
                    }
                }
                RequireConstraint::FacetSummaryOfReference(of_reference) => {
                    let reference = faceted_reference(schema, &of_reference.name)?;
                    self.facet_summary(&of_reference.summary, schema, reference)?;
                }
                RequireConstraint::FacetGroupsConjunction(relation)
                | RequireConstraint::FacetGroupsDisjunction(relation)
                | RequireConstraint::FacetGroupsNegation(relation) => {
                    faceted_reference(schema, &relation.reference)?;
                }
                RequireConstraint::PriceType(_) | RequireConstraint::QueryTelemetry => {}
                RequireConstraint::PriceHistogram { bucket_count, .. } => {
                    bucket_count_positive(*bucket_count)?;
                }
                RequireConstraint::AttributeHistogram {
                    bucket_count,
                    names,
                    ..
                } => {
                    bucket_count_positive(*bucket_count)?;
                    for name in names {
                        let attribute = Target::Entity(schema).attribute(name)?;
                        self.localized(attribute)?;
                        if !attribute.ty.is_numeric() || attribute.array {
                            return Err(QueryError::NotNumeric {
                                collection: schema.name.clone(),
                                attribute: name.clone(),
                            });
                        }
                    }
                }
                RequireConstraint::HierarchyOfSelf(of_self) => {
                    if !schema.with_hierarchy {
                        return Err(QueryError::NotHierarchical(schema.name.clone()));
                    }
                    self.order_by(&of_self.order_by, Target::Entity(schema), None)?;
                    self.hierarchy_requirements(&of_self.requirements, schema)?;
                }
                RequireConstraint::HierarchyOfReference(of_reference) => {
                    let reference = reference_schema(schema, &of_reference.name)?;
                    let hierarchy = self.validator.schema(&reference.referenced_entity_type)?;
                    if !hierarchy.with_hierarchy {
                        return Err(QueryError::NotHierarchical(hierarchy.name.clone()));
                    }
                    self.order_by(&of_reference.order_by, Target::Entity(hierarchy), None)?;
                    self.hierarchy_requirements(&of_reference.requirements, hierarchy)?;
                }
            }
        }
        if slices > 1 {
            return Err(QueryError::invalid("only one page or strip may be requested"));
        }
        Ok(())
    }

    fn page_size(&self, size: usize) -> QueryResult<()> {
        match self.validator.max_page_size {
            Some(max) if size > max => Err(QueryError::PageSizeExceeded { size, max }),
            _ => Ok(()),
        }
    }

    fn entity_fetch(&self, fetch: &EntityFetch, schema: &'a EntitySchema) -> QueryResult<()> {
        for content in &fetch.content {
            match content {
                EntityContent::AttributeContent(names) => {
                    for name in names {
                        Target::Entity(schema).attribute(name)?;
                    }
                }
                EntityContent::AssociatedDataContent(names) => {
                    for name in names {
                        if schema.associated_data(name).is_none() {
                            return Err(QueryError::UnknownAssociatedData {
                                collection: schema.name.clone(),
                                name: name.clone(),
                            });
                        }
                    }
                }
                EntityContent::PriceContent { .. } | EntityContent::DataInLocales(_) => {}
                EntityContent::ReferenceContent(content) => {
                    for name in &content.names {
                        reference_schema(schema, name)?;
                    }
                    let references: Vec<&ReferenceSchema> = schema
                        .references
                        .iter()
                        .filter(|r| content.includes(&r.name))
                        .collect();
                    for reference in references {
                        if let Some(names) = &content.attribute_content {
                            for name in names {
                                Target::Reference(schema, reference).attribute(name)?;
                            }
                        }
                        let nested = !content.filter_by.is_empty()
                            || !content.order_by.is_empty()
                            || content.entity_fetch.is_some();
                        if nested {
                            let referenced =
                                self.validator.schema(&reference.referenced_entity_type)?;
                            self.filter_by(&content.filter_by, Target::Entity(referenced), false)?;
                            self.order_by(&content.order_by, Target::Entity(referenced), None)?;
                            if let Some(fetch) = &content.entity_fetch {
                                self.entity_fetch(fetch, referenced)?;
                            }
                        }
                        if let Some(group_fetch) = &content.entity_group_fetch {
                            let group_type = reference.group_type.as_deref().ok_or_else(|| {
                                QueryError::invalid(format!(
                                    "reference `{}` declares no group type",
                                    reference.name
                                ))
                            })?;
                            let group = self.validator.schema(group_type)?;
                            self.entity_fetch(group_fetch, group)?;
                        }
                    }
                }
                EntityContent::HierarchyContent {
                    stop_at,
                    entity_fetch,
                } => {
                    if !schema.with_hierarchy {
                        return Err(QueryError::NotHierarchical(schema.name.clone()));
                    }
                    self.stop_at(stop_at.as_ref(), schema)?;
                    if let Some(fetch) = entity_fetch {
                        self.entity_fetch(fetch, schema)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn facet_summary(
        &self,
        spec: &FacetSummarySpec,
        schema: &'a EntitySchema,
        reference: &'a ReferenceSchema,
    ) -> QueryResult<()> {
        let needs_facets = !spec.filter_by.is_empty()
            || !spec.order_by.is_empty()
            || spec.entity_fetch.is_some();
        if needs_facets {
            let referenced = self.validator.schema(&reference.referenced_entity_type)?;
            self.filter_by(&spec.filter_by, Target::Entity(referenced), false)?;
            self.order_by(&spec.order_by, Target::Entity(referenced), None)?;
            if let Some(fetch) = &spec.entity_fetch {
                self.entity_fetch(fetch, referenced)?;
            }
        }
        let needs_groups = !spec.filter_group_by.is_empty()
            || !spec.order_group_by.is_empty()
            || spec.group_entity_fetch.is_some();
        if needs_groups {
            let group_type = reference.group_type.as_deref().ok_or_else(|| {
                QueryError::invalid(format!(
                    "reference `{}` of `{}` declares no group type",
                    reference.name, schema.name
                ))
            })?;
            let group = self.validator.schema(group_type)?;
            self.filter_by(&spec.filter_group_by, Target::Entity(group), false)?;
            self.order_by(&spec.order_group_by, Target::Entity(group), None)?;
            if let Some(fetch) = &spec.group_entity_fetch {
                self.entity_fetch(fetch, group)?;
            }
        }
        Ok(())
    }

    fn hierarchy_requirements(
        &self,
        requirements: &[HierarchyRequirement],
        hierarchy: &'a EntitySchema,
    ) -> QueryResult<()> {
        let mut names = HashSet::new();
        for requirement in requirements {
            let axis = requirement.axis();
            if !names.insert(axis.output_name.as_str()) {
                return Err(QueryError::invalid(format!(
                    "hierarchy output name `{}` used twice",
                    axis.output_name
                )));
            }
            if let HierarchyRequirement::FromNode(spec) = requirement {
                self.filter_by(&spec.node, Target::Entity(hierarchy), false)?;
            }
            self.stop_at(axis.stop_at.as_ref(), hierarchy)?;
            if let Some(fetch) = &axis.entity_fetch {
                self.entity_fetch(fetch, hierarchy)?;
            }
        }
        Ok(())
    }

    fn stop_at(&self, stop_at: Option<&StopAt>, hierarchy: &'a EntitySchema) -> QueryResult<()> {
        match stop_at {
            Some(StopAt::Node(filter)) => self.filter_by(filter, Target::Entity(hierarchy), false),
            Some(StopAt::Level(0)) => Err(QueryError::invalid("levels start at 1")),
            _ => Ok(()),
        }
    }
}

fn reference_schema<'s>(schema: &'s EntitySchema, name: &str) -> QueryResult<&'s ReferenceSchema> {
    schema
        .reference(name)
        .ok_or_else(|| QueryError::UnknownReference {
            collection: schema.name.clone(),
            reference: name.to_string(),
        })
}

fn faceted_reference<'s>(schema: &'s EntitySchema, name: &str) -> QueryResult<&'s ReferenceSchema> {
    let reference = reference_schema(schema, name)?;
    if !reference.faceted {
        return Err(QueryError::NotFaceted {
            collection: schema.name.clone(),
            reference: name.to_string(),
        });
    }
    Ok(reference)
}

fn bucket_count_positive(bucket_count: usize) -> QueryResult<()> {
    if bucket_count == 0 {
        return Err(QueryError::invalid("histogram needs at least one bucket"));
    }
    Ok(())
}

fn check_literal(
    constraint: &'static str,
    attribute: &AttributeSchema,
    expected: AttributeType,
    literal: &Scalar,
) -> QueryResult<()> {
    if literal.ty() != expected {
        return Err(QueryError::TypeMismatch {
            constraint,
            attribute: attribute.name.clone(),
            expected: expected.to_string(),
            found: literal.ty().to_string(),
        });
    }
    Ok(())
}

fn require_type(
    constraint: &'static str,
    attribute: &AttributeSchema,
    allowed: &[AttributeType],
) -> QueryResult<()> {
    if !allowed.contains(&attribute.ty) {
        return Err(QueryError::TypeMismatch {
            constraint,
            attribute: attribute.name.clone(),
            expected: allowed
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(" or "),
            found: attribute.ty.to_string(),
        });
    }
    Ok(())
}
