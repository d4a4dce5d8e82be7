//! Filter evaluator
//!
//! Reduces a filter tree to a bitmap of primary keys. Every node is
//! evaluated within a universe and never returns ids outside of it:
//!
//! - `and` intersects its children, an empty `and` is the universe
//! - `or` unions its children, an empty `or` is the empty set
//! - `not` complements its child within the universe
//! - `userFilter` children see the result of their non-user siblings as
//!   their universe
//!
//! Facet selections inside a `userFilter` on the conjunctive spine of the
//! query (root list and nested `and`) are pulled out of the tree and
//! combined by the facet formula, so that impact counterfactuals can reuse
//! the rest of the evaluation unchanged. `facetHaving` anywhere else is a
//! plain reference filter and stays in the rest.

use chrono::{DateTime, Utc};
use roaring::RoaringBitmap;

use super::context::QueryContext;
use super::errors::{EvaluationError, EvaluationResult};
use super::facet::{FacetFormula, FacetSelection};
use super::hierarchy::HierarchyResolver;
use super::price::{PriceInterval, PriceResolver};
use crate::catalog::{
    AttributeValue, CollectionIndex, Locale, Reference, ReferenceSchema, Scalar, ScalarPredicate,
};
use crate::query::{AttributeSpecialValue, FilterBy, FilterConstraint, QueryError};

/// Breakdown of a filtered query
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Final candidates
    pub result: RoaringBitmap,
    /// Candidates of everything except the facet selection
    pub rest: RoaringBitmap,
    pub selection: FacetSelection,
}

/// Evaluates filters against one collection
pub struct FilterEvaluator<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    collection: &'a dyn CollectionIndex,
}

impl<'c, 'a> FilterEvaluator<'c, 'a> {
    pub fn new(ctx: &'c QueryContext<'a>, collection: &'a dyn CollectionIndex) -> Self {
        Self { ctx, collection }
    }

    pub fn collection(&self) -> &'a dyn CollectionIndex {
        self.collection
    }

    /// Candidates of the whole filter
    pub fn evaluate(&self, filter_by: &FilterBy) -> EvaluationResult<RoaringBitmap> {
        Ok(self.evaluate_parts(filter_by)?.result)
    }

    /// Candidates split into the facet selection and everything else
    pub fn evaluate_parts(&self, filter_by: &FilterBy) -> EvaluationResult<FilterOutcome> {
        let mut spine = Vec::new();
        spine_facets(&filter_by.constraints, false, &mut spine);

        let mut selection = FacetSelection::default();
        for (reference, filter) in spine {
            for pk in self.selected_facets(reference, filter)? {
                selection.insert(reference, pk);
            }
        }

        let stripped = strip_spine_facets(&filter_by.constraints, false);
        let universe = self.collection.entities().universe();
        let rest = self.conjunction(&stripped, universe)?;
        let result = if selection.is_empty() {
            rest.clone()
        } else {
            let formula = FacetFormula::new(self.ctx, self.collection);
            &rest & &formula.evaluate(&selection)
        };
        Ok(FilterOutcome {
            result,
            rest,
            selection,
        })
    }

    /// Implicit `and` over a constraint list
    pub fn conjunction(
        &self,
        constraints: &[FilterConstraint],
        universe: &RoaringBitmap,
    ) -> EvaluationResult<RoaringBitmap> {
        let mut acc = universe.clone();
        for constraint in constraints
            .iter()
            .filter(|c| !matches!(c, FilterConstraint::UserFilter(_)))
        {
            if acc.is_empty() {
                return Ok(acc);
            }
            acc &= self.constraint(constraint, &acc)?;
        }
        for constraint in constraints
            .iter()
            .filter(|c| matches!(c, FilterConstraint::UserFilter(_)))
        {
            let narrowed = self.constraint(constraint, &acc)?;
            acc &= narrowed;
        }
        Ok(acc)
    }

    fn constraint(
        &self,
        constraint: &FilterConstraint,
        universe: &RoaringBitmap,
    ) -> EvaluationResult<RoaringBitmap> {
        let found = match constraint {
            FilterConstraint::And(children) | FilterConstraint::UserFilter(children) => {
                return self.conjunction(children, universe)
            }
            FilterConstraint::Or(children) => {
                let mut acc = RoaringBitmap::new();
                for child in children {
                    acc |= self.constraint(child, universe)?;
                }
                acc
            }
            FilterConstraint::Not(child) => universe - &self.constraint(child, universe)?,
            FilterConstraint::AttributeIs {
                name,
                value: AttributeSpecialValue::Null,
            } => {
                let present = self.lookup(name, &ScalarPredicate::IsNotNull);
                return Ok(universe - &present);
            }
            FilterConstraint::EntityPrimaryKeyInSet(keys) => keys.iter().copied().collect(),
            FilterConstraint::EntityLocaleEquals(locale) => {
                self.collection.entities().in_locale(locale)
            }
            FilterConstraint::HierarchyWithin {
                reference,
                of,
                specification,
            } => {
                let resolver = HierarchyResolver::new(self.ctx, self.collection, reference.as_deref())?;
                resolver
                    .scope(Some(of.as_ref()), specification)?
                    .candidates(&resolver)
            }
            FilterConstraint::HierarchyWithinRoot {
                reference,
                specification,
            } => {
                let resolver = HierarchyResolver::new(self.ctx, self.collection, reference.as_deref())?;
                resolver.scope(None, specification)?.candidates(&resolver)
            }
            FilterConstraint::PriceInCurrency(_)
            | FilterConstraint::PriceInPriceLists(_)
            | FilterConstraint::PriceValidIn(_)
            | FilterConstraint::PriceValidInNow => return Ok(self.prices().sellable(universe)),
            FilterConstraint::PriceBetween { from, to } => {
                let interval = PriceInterval {
                    from: *from,
                    to: *to,
                };
                return Ok(self.prices().sellable_within(universe, &interval));
            }
            FilterConstraint::ReferenceHaving { name, filter }
            | FilterConstraint::FacetHaving { name, filter } => {
                return self.reference_having(name, filter, universe)
            }
            FilterConstraint::EntityHaving(_) => {
                return Err(QueryError::invalid(
                    "entityHaving is allowed only inside referenceHaving or facetHaving",
                )
                .into())
            }
            other => match scalar_predicate(other, self.ctx.now) {
                Some((name, predicate)) => self.lookup(name, &predicate),
                None => {
                    return Err(QueryError::invalid(format!(
                        "{} cannot be evaluated here",
                        other.name()
                    ))
                    .into())
                }
            },
        };
        Ok(found & universe)
    }

    fn lookup(&self, attribute: &str, predicate: &ScalarPredicate) -> RoaringBitmap {
        let localized = self
            .collection
            .schema()
            .attribute(attribute)
            .map_or(false, |a| a.localized);
        self.collection
            .attributes()
            .lookup(attribute, self.ctx.locale_for(localized), predicate)
    }

    fn prices(&self) -> PriceResolver<'_> {
        PriceResolver::new(self.collection.prices(), &self.ctx.prices, self.ctx.price_type)
    }

    fn reference_schema(&self, name: &str) -> EvaluationResult<&'a ReferenceSchema> {
        let schema = self.collection.schema();
        schema.reference(name).ok_or_else(|| {
            EvaluationError::Query(QueryError::UnknownReference {
                collection: schema.name.clone(),
                reference: name.to_string(),
            })
        })
    }

    /// Entities of the universe holding a matching reference
    fn reference_having(
        &self,
        name: &str,
        filter: &[FilterConstraint],
        universe: &RoaringBitmap,
    ) -> EvaluationResult<RoaringBitmap> {
        let predicate = self.reference_predicate(name, filter)?;
        let references = self.collection.references();
        if let ReferencePredicate::Targets(targets) = &predicate {
            let holders = targets
                .iter()
                .fold(RoaringBitmap::new(), |acc, t| acc | references.referencing(name, t));
            return Ok(holders & universe);
        }
        Ok(universe
            .iter()
            .filter(|pk| {
                references
                    .references_of(*pk, name)
                    .into_iter()
                    .any(|r| predicate.matches(r))
            })
            .collect())
    }

    /// Referenced primary keys selected by a facet constraint
    fn selected_facets(&self, name: &str, filter: &[FilterConstraint]) -> EvaluationResult<Vec<u32>> {
        let predicate = self.reference_predicate(name, filter)?;
        if let ReferencePredicate::Targets(targets) = &predicate {
            return Ok(targets.iter().collect());
        }
        let references = self.collection.references();
        let mut selected = Vec::new();
        for (key, holders) in self.collection.facets().facets_of(name) {
            if selected.contains(&key.primary_key) {
                continue;
            }
            let matched = holders.iter().any(|pk| {
                references
                    .references_of(pk, name)
                    .into_iter()
                    .any(|r| r.referenced_primary_key == key.primary_key && predicate.matches(r))
            });
            if matched {
                selected.push(key.primary_key);
            }
        }
        Ok(selected)
    }

    fn reference_predicate(
        &self,
        name: &str,
        filter: &[FilterConstraint],
    ) -> EvaluationResult<ReferencePredicate> {
        let schema = self.reference_schema(name)?;
        let mut parts = filter
            .iter()
            .map(|c| self.compile(schema, c))
            .collect::<EvaluationResult<Vec<_>>>()?;
        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => ReferencePredicate::All(parts),
        })
    }

    fn compile(
        &self,
        schema: &ReferenceSchema,
        constraint: &FilterConstraint,
    ) -> EvaluationResult<ReferencePredicate> {
        let compile_all = |children: &[FilterConstraint]| {
            children
                .iter()
                .map(|c| self.compile(schema, c))
                .collect::<EvaluationResult<Vec<_>>>()
        };
        let locale_of = |name: &str| {
            let localized = schema.attribute(name).map_or(false, |a| a.localized);
            self.ctx.locale_for(localized).cloned()
        };
        Ok(match constraint {
            FilterConstraint::And(children) | FilterConstraint::UserFilter(children) => {
                ReferencePredicate::All(compile_all(children)?)
            }
            FilterConstraint::Or(children) => ReferencePredicate::Any(compile_all(children)?),
            FilterConstraint::Not(child) => {
                ReferencePredicate::Not(Box::new(self.compile(schema, child)?))
            }
            FilterConstraint::AttributeIs {
                name,
                value: AttributeSpecialValue::Null,
            } => ReferencePredicate::Null {
                name: name.clone(),
                locale: locale_of(name),
            },
            FilterConstraint::EntityPrimaryKeyInSet(keys) => {
                ReferencePredicate::Targets(keys.iter().copied().collect())
            }
            FilterConstraint::EntityHaving(filter) => {
                let referenced = self.ctx.collection(&schema.referenced_entity_type)?;
                let nested = FilterEvaluator::new(self.ctx, referenced)
                    .evaluate(&FilterBy::new(filter.clone()))
                    .map_err(|e| EvaluationError::nested(&schema.referenced_entity_type, e))?;
                ReferencePredicate::Targets(nested)
            }
            other => match scalar_predicate(other, self.ctx.now) {
                Some((name, predicate)) => ReferencePredicate::Attribute {
                    name: name.to_string(),
                    locale: locale_of(name),
                    predicate,
                },
                None => {
                    return Err(QueryError::invalid(format!(
                        "{} is not allowed inside reference `{}` constraints",
                        other.name(),
                        schema.name
                    ))
                    .into())
                }
            },
        })
    }
}

/// Compiled predicate over a single reference
#[derive(Debug, Clone)]
enum ReferencePredicate {
    All(Vec<ReferencePredicate>),
    Any(Vec<ReferencePredicate>),
    Not(Box<ReferencePredicate>),
    Attribute {
        name: String,
        locale: Option<Locale>,
        predicate: ScalarPredicate,
    },
    Null {
        name: String,
        locale: Option<Locale>,
    },
    /// Referenced primary key is one of these
    Targets(RoaringBitmap),
}

impl ReferencePredicate {
    fn matches(&self, reference: &Reference) -> bool {
        match self {
            ReferencePredicate::All(parts) => parts.iter().all(|p| p.matches(reference)),
            ReferencePredicate::Any(parts) => parts.iter().any(|p| p.matches(reference)),
            ReferencePredicate::Not(inner) => !inner.matches(reference),
            ReferencePredicate::Attribute {
                name,
                locale,
                predicate,
            } => reference
                .attributes
                .lookup(name, locale.as_ref())
                .map_or(false, |v: &AttributeValue| v.scalars().any(|s| predicate.matches(s))),
            ReferencePredicate::Null { name, locale } => {
                reference.attributes.lookup(name, locale.as_ref()).is_none()
            }
            ReferencePredicate::Targets(targets) => targets.contains(reference.referenced_primary_key),
        }
    }
}

/// Maps an attribute constraint to the predicate an index answers
fn scalar_predicate(
    constraint: &FilterConstraint,
    now: DateTime<Utc>,
) -> Option<(&str, ScalarPredicate)> {
    let mapped = match constraint {
        FilterConstraint::AttributeEquals { name, value } => (name, ScalarPredicate::Equals(value.clone())),
        FilterConstraint::AttributeGreaterThan { name, value } => {
            (name, ScalarPredicate::GreaterThan(value.clone()))
        }
        FilterConstraint::AttributeGreaterThanEquals { name, value } => {
            (name, ScalarPredicate::GreaterThanEquals(value.clone()))
        }
        FilterConstraint::AttributeLessThan { name, value } => {
            (name, ScalarPredicate::LessThan(value.clone()))
        }
        FilterConstraint::AttributeLessThanEquals { name, value } => {
            (name, ScalarPredicate::LessThanEquals(value.clone()))
        }
        FilterConstraint::AttributeBetween { name, from, to } => {
            let predicate = match (from, to) {
                (Some(from), Some(to)) => ScalarPredicate::Between(from.clone(), to.clone()),
                (Some(from), None) => ScalarPredicate::GreaterThanEquals(from.clone()),
                (None, Some(to)) => ScalarPredicate::LessThanEquals(to.clone()),
                (None, None) => ScalarPredicate::IsNotNull,
            };
            (name, predicate)
        }
        FilterConstraint::AttributeInSet { name, values } => {
            (name, ScalarPredicate::InSet(values.clone()))
        }
        FilterConstraint::AttributeStartsWith { name, value } => {
            (name, ScalarPredicate::StartsWith(value.clone()))
        }
        FilterConstraint::AttributeEndsWith { name, value } => {
            (name, ScalarPredicate::EndsWith(value.clone()))
        }
        FilterConstraint::AttributeContains { name, value } => {
            (name, ScalarPredicate::Contains(value.clone()))
        }
        FilterConstraint::AttributeEqualsTrue { name } => {
            (name, ScalarPredicate::Equals(Scalar::Bool(true)))
        }
        FilterConstraint::AttributeEqualsFalse { name } => {
            (name, ScalarPredicate::Equals(Scalar::Bool(false)))
        }
        FilterConstraint::AttributeIs {
            name,
            value: AttributeSpecialValue::NotNull,
        } => (name, ScalarPredicate::IsNotNull),
        FilterConstraint::AttributeInRange { name, value } => {
            (name, ScalarPredicate::InRange(value.clone()))
        }
        FilterConstraint::AttributeInRangeNow { name } => {
            (name, ScalarPredicate::InRange(Scalar::DateTime(now)))
        }
        _ => return None,
    };
    Some((mapped.0.as_str(), mapped.1))
}

/// Facet constraints of a `userFilter`, reachable through `and` and `userFilter` only
fn spine_facets<'f>(
    constraints: &'f [FilterConstraint],
    in_user_filter: bool,
    out: &mut Vec<(&'f str, &'f [FilterConstraint])>,
) {
    for constraint in constraints {
        match constraint {
            FilterConstraint::And(children) => spine_facets(children, in_user_filter, out),
            FilterConstraint::UserFilter(children) => spine_facets(children, true, out),
            FilterConstraint::FacetHaving { name, filter } if in_user_filter => out.push((name, filter)),
            _ => {}
        }
    }
}

fn strip_spine_facets(constraints: &[FilterConstraint], in_user_filter: bool) -> Vec<FilterConstraint> {
    constraints
        .iter()
        .filter(|c| !(in_user_filter && matches!(c, FilterConstraint::FacetHaving { .. })))
        .map(|c| match c {
            FilterConstraint::And(children) => {
                FilterConstraint::And(strip_spine_facets(children, in_user_filter))
            }
            FilterConstraint::UserFilter(children) => {
                FilterConstraint::UserFilter(strip_spine_facets(children, true))
            }
            other => other.clone(),
        })
        .collect()
}
