//! Facet computation engine
//!
//! Facet selection formula, per (reference, group):
//!
//! - facets of one group combine with `or`, or with `and` when the group is
//!   declared conjunctive
//! - a negated group matches entities holding none of its selected facets
//! - groups combine with `and`; groups declared disjunctive are instead
//!   joined to that conjunction with `or`
//!
//! Counts are taken over the candidates of the query without its user
//! filter. Impact re-runs only the formula with one facet toggled and
//! intersects with the unchanged rest of the filter.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use roaring::RoaringBitmap;
use serde::Serialize;
use tracing::debug;

use super::context::QueryContext;
use super::errors::EvaluationResult;
use super::fetch::{EntityBody, EntityFetcher};
use super::filter::{FilterEvaluator, FilterOutcome};
use super::order::OrderEvaluator;
use crate::catalog::{CollectionIndex, FacetKey, ReferenceSchema};
use crate::query::{FacetStatisticsDepth, FacetSummarySpec, Require};

/// Selected facets per reference name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSelection {
    selected: BTreeMap<String, BTreeSet<u32>>,
}

impl FacetSelection {
    pub fn is_empty(&self) -> bool {
        self.selected.values().all(BTreeSet::is_empty)
    }

    pub fn insert(&mut self, reference: &str, primary_key: u32) {
        self.selected
            .entry(reference.to_string())
            .or_default()
            .insert(primary_key);
    }

    pub fn contains(&self, reference: &str, primary_key: u32) -> bool {
        self.selected
            .get(reference)
            .map_or(false, |s| s.contains(&primary_key))
    }

    pub fn with(&self, reference: &str, primary_key: u32) -> Self {
        let mut copy = self.clone();
        copy.insert(reference, primary_key);
        copy
    }

    pub fn without(&self, reference: &str, primary_key: u32) -> Self {
        let mut copy = self.clone();
        if let Some(selected) = copy.selected.get_mut(reference) {
            selected.remove(&primary_key);
        }
        copy
    }

    /// Same selection with every facet of the listed keys removed
    pub fn without_all(&self, reference: &str, primary_keys: impl IntoIterator<Item = u32>) -> Self {
        let mut copy = self.clone();
        if let Some(selected) = copy.selected.get_mut(reference) {
            for pk in primary_keys {
                selected.remove(&pk);
            }
        }
        copy
    }

    pub fn references(&self) -> impl Iterator<Item = (&str, &BTreeSet<u32>)> {
        self.selected.iter().map(|(r, s)| (r.as_str(), s))
    }
}

/// Evaluates a facet selection to the entities it admits
pub struct FacetFormula<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    collection: &'a dyn CollectionIndex,
}

impl<'c, 'a> FacetFormula<'c, 'a> {
    pub fn new(ctx: &'c QueryContext<'a>, collection: &'a dyn CollectionIndex) -> Self {
        Self { ctx, collection }
    }

    pub fn evaluate(&self, selection: &FacetSelection) -> RoaringBitmap {
        let universe = self.collection.entities().universe();
        let missing = RoaringBitmap::new();
        let mut groups: BTreeMap<(&str, Option<u32>), Vec<&RoaringBitmap>> = BTreeMap::new();

        for (reference, selected) in selection.references() {
            let mut found = BTreeSet::new();
            for (key, holders) in self.collection.facets().facets_of(reference) {
                if selected.contains(&key.primary_key) {
                    found.insert(key.primary_key);
                    groups.entry((reference, key.group)).or_default().push(holders);
                }
            }
            // unknown facets admit nothing
            if selected.iter().any(|pk| !found.contains(pk)) {
                groups.entry((reference, None)).or_default().push(&missing);
            }
        }

        let mut conjunction: Option<RoaringBitmap> = None;
        let mut disjunction: Option<RoaringBitmap> = None;
        for ((reference, group), holders) in groups {
            let any = || holders.iter().fold(RoaringBitmap::new(), |acc, h| acc | *h);
            let set = if self.ctx.is_negated(reference, group) {
                universe - &any()
            } else if self.ctx.is_conjunctive(reference, group) {
                holders
                    .iter()
                    .skip(1)
                    .fold(holders[0].clone(), |acc, h| acc & *h)
            } else {
                any()
            };
            if self.ctx.is_disjunctive(reference, group) {
                disjunction = Some(disjunction.map_or(set.clone(), |d| d | set));
            } else {
                conjunction = Some(conjunction.map_or(set.clone(), |c| c & set));
            }
        }

        match (conjunction, disjunction) {
            (None, None) => universe.clone(),
            (Some(c), None) => c,
            (None, Some(d)) => d,
            (Some(c), Some(d)) => c | d,
        }
    }
}

/// Counterfactual result of toggling one facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestImpact {
    /// Change of the result count
    pub difference: i64,
    /// Result count with the facet toggled
    pub match_count: u64,
    /// Toggling the facet leads somewhere useful
    pub has_sense: bool,
}

/// Statistics of one facet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetStatistics {
    pub facet: EntityBody,
    pub requested: bool,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<RequestImpact>,
}

/// Statistics of one facet group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetGroupStatistics {
    pub reference_name: String,
    /// Absent for facets without a group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<EntityBody>,
    /// Distinct entities holding any facet of the group
    pub count: u64,
    pub facets: Vec<FacetStatistics>,
}

/// Facet summary extra result
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSummary {
    pub groups: Vec<FacetGroupStatistics>,
}

impl FacetSummary {
    pub fn group(&self, reference: &str, group: Option<u32>) -> Option<&FacetGroupStatistics> {
        self.groups.iter().find(|g| {
            g.reference_name == reference && g.group.as_ref().map(|b| b.primary_key) == group
        })
    }

    pub fn facet(&self, reference: &str, primary_key: u32) -> Option<&FacetStatistics> {
        self.groups
            .iter()
            .filter(|g| g.reference_name == reference)
            .flat_map(|g| g.facets.iter())
            .find(|f| f.facet.primary_key == primary_key)
    }
}

/// Builds the facet summary of a filtered query
pub struct FacetSummaryEngine<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    collection: &'a dyn CollectionIndex,
    outcome: &'c FilterOutcome,
    /// Candidates facet counts are taken over
    base: &'c RoaringBitmap,
    fetcher: &'c EntityFetcher<'c, 'a>,
}

struct ImpactTask {
    key: FacetKey,
    group_members: Vec<u32>,
    requested: bool,
}

impl<'c, 'a> FacetSummaryEngine<'c, 'a> {
    pub fn new(
        ctx: &'c QueryContext<'a>,
        collection: &'a dyn CollectionIndex,
        outcome: &'c FilterOutcome,
        base: &'c RoaringBitmap,
        fetcher: &'c EntityFetcher<'c, 'a>,
    ) -> Self {
        Self {
            ctx,
            collection,
            outcome,
            base,
            fetcher,
        }
    }

    /// Summary over every requested reference, or `None` when not requested
    pub fn compute(&self, require: &Require) -> EvaluationResult<Option<FacetSummary>> {
        let general = require.facet_summary();
        let specific: BTreeMap<&str, &FacetSummarySpec> = require
            .facet_summaries_of_reference()
            .map(|s| (s.name.as_str(), &s.summary))
            .collect();
        if general.is_none() && specific.is_empty() {
            return Ok(None);
        }

        let mut references: Vec<&ReferenceSchema> = self
            .collection
            .schema()
            .references
            .iter()
            .filter(|r| r.faceted)
            .filter(|r| general.is_some() || specific.contains_key(r.name.as_str()))
            .collect();
        references.sort_by(|a, b| a.name.cmp(&b.name));

        let mut summary = FacetSummary::default();
        for reference in references {
            let spec = specific
                .get(reference.name.as_str())
                .copied()
                .or(general)
                .cloned()
                .unwrap_or_default();
            summary.groups.extend(self.reference_groups(reference, &spec)?);
        }
        debug!(groups = summary.groups.len(), "facet summary computed");
        Ok(Some(summary))
    }

    fn reference_groups(
        &self,
        reference: &ReferenceSchema,
        spec: &FacetSummarySpec,
    ) -> EvaluationResult<Vec<FacetGroupStatistics>> {
        let name = reference.name.as_str();
        let allowed_facets = self.nested_filter(&reference.referenced_entity_type, spec, false)?;
        let allowed_groups = match reference.group_type.as_deref() {
            Some(group_type) => self.nested_filter(group_type, spec, true)?,
            None => None,
        };

        let mut by_group: BTreeMap<Option<u32>, Vec<(FacetKey, &RoaringBitmap)>> = BTreeMap::new();
        for (key, holders) in self.collection.facets().facets_of(name) {
            let requested = self.outcome.selection.contains(name, key.primary_key);
            let visible = allowed_facets.as_ref().map_or(true, |a| a.contains(key.primary_key));
            let group_visible = match (key.group, &allowed_groups) {
                (Some(group), Some(allowed)) => allowed.contains(group),
                _ => true,
            };
            if visible && group_visible && (requested || !holders.is_disjoint(self.base)) {
                by_group.entry(key.group).or_default().push((key, holders));
            }
        }

        let mut groups = Vec::with_capacity(by_group.len());
        for (group, mut facets) in by_group {
            self.order_facets(&reference.referenced_entity_type, &spec.order_by, &mut facets)?;
            let negated = self.ctx.is_negated(name, group);
            let base_len = self.base.len();

            let impacts = match spec.depth {
                FacetStatisticsDepth::Counts => vec![None; facets.len()],
                FacetStatisticsDepth::Impact => {
                    let members: Vec<u32> = facets.iter().map(|(k, _)| k.primary_key).collect();
                    let tasks: Vec<ImpactTask> = facets
                        .iter()
                        .map(|(key, _)| ImpactTask {
                            key: *key,
                            group_members: members.clone(),
                            requested: self.outcome.selection.contains(name, key.primary_key),
                        })
                        .collect();
                    self.impacts(name, &tasks).into_iter().map(Some).collect()
                }
            };

            let mut group_holders = RoaringBitmap::new();
            let mut statistics = Vec::with_capacity(facets.len());
            for ((key, holders), impact) in facets.iter().zip(impacts) {
                group_holders |= *holders;
                let held = self.base.intersection_len(holders);
                statistics.push(FacetStatistics {
                    facet: self.body(&reference.referenced_entity_type, key.primary_key, spec.entity_fetch.as_ref())?,
                    requested: self.outcome.selection.contains(name, key.primary_key),
                    count: if negated { base_len - held } else { held },
                    impact,
                });
            }

            let group_body = match (group, reference.group_type.as_deref()) {
                (Some(pk), Some(group_type)) => {
                    Some(self.body(group_type, pk, spec.group_entity_fetch.as_ref())?)
                }
                (Some(pk), None) => Some(EntityBody::reference(name, pk)),
                (None, _) => None,
            };
            groups.push(FacetGroupStatistics {
                reference_name: name.to_string(),
                group: group_body,
                count: self.base.intersection_len(&group_holders),
                facets: statistics,
            });
        }

        self.order_groups(reference, &spec.order_group_by, &mut groups)?;
        Ok(groups)
    }

    fn impacts(&self, reference: &str, tasks: &[ImpactTask]) -> Vec<RequestImpact> {
        let formula = FacetFormula::new(self.ctx, self.collection);
        let current = self.outcome.result.len() as i64;
        let selection = &self.outcome.selection;
        let rest = &self.outcome.rest;

        let impact = |task: &ImpactTask| {
            let pk = task.key.primary_key;
            let toggled = if task.requested {
                selection.without(reference, pk)
            } else {
                selection.with(reference, pk)
            };
            let match_count = rest.intersection_len(&formula.evaluate(&toggled));
            let difference = match_count as i64 - current;
            let has_sense = match_count > 0
                && (difference != 0 || {
                    let alone = selection
                        .without_all(reference, task.group_members.iter().copied())
                        .with(reference, pk);
                    !rest.is_disjoint(&formula.evaluate(&alone))
                });
            RequestImpact {
                difference,
                match_count,
                has_sense,
            }
        };

        if self.ctx.config.parallel_impact {
            tasks.par_iter().map(impact).collect()
        } else {
            tasks.iter().map(impact).collect()
        }
    }

    /// Nested facet or group filter; `None` admits everything
    fn nested_filter(
        &self,
        collection: &str,
        spec: &FacetSummarySpec,
        groups: bool,
    ) -> EvaluationResult<Option<RoaringBitmap>> {
        let filter_by = if groups {
            &spec.filter_group_by
        } else {
            &spec.filter_by
        };
        if filter_by.is_empty() {
            return Ok(None);
        }
        let target = self.ctx.collection(collection)?;
        FilterEvaluator::new(self.ctx, target)
            .evaluate(filter_by)
            .map(Some)
            .map_err(|e| super::errors::EvaluationError::nested(collection, e))
    }

    fn order_facets(
        &self,
        collection: &str,
        order_by: &crate::query::OrderBy,
        facets: &mut [(FacetKey, &RoaringBitmap)],
    ) -> EvaluationResult<()> {
        if order_by.is_empty() {
            facets.sort_by_key(|(k, _)| k.primary_key);
            return Ok(());
        }
        let target = self.ctx.collection(collection)?;
        let ids: RoaringBitmap = facets.iter().map(|(k, _)| k.primary_key).collect();
        let order = positions(&OrderEvaluator::new(self.ctx, target).sort(&ids, order_by, None));
        facets.sort_by_key(|(k, _)| order.get(&k.primary_key).copied());
        Ok(())
    }

    fn order_groups(
        &self,
        reference: &ReferenceSchema,
        order_by: &crate::query::OrderBy,
        groups: &mut [FacetGroupStatistics],
    ) -> EvaluationResult<()> {
        let group_pk = |g: &FacetGroupStatistics| g.group.as_ref().map(|b| b.primary_key);
        match reference.group_type.as_deref() {
            Some(group_type) if !order_by.is_empty() => {
                let target = self.ctx.collection(group_type)?;
                let ids: RoaringBitmap = groups.iter().filter_map(group_pk).collect();
                let order = positions(&OrderEvaluator::new(self.ctx, target).sort(&ids, order_by, None));
                groups.sort_by_key(|g| match group_pk(g) {
                    Some(pk) => (0, order.get(&pk).copied()),
                    None => (1, None),
                });
            }
            _ => groups.sort_by_key(|g| match group_pk(g) {
                Some(pk) => (0, pk),
                None => (1, 0),
            }),
        }
        Ok(())
    }

    fn body(
        &self,
        collection: &str,
        primary_key: u32,
        fetch: Option<&crate::query::EntityFetch>,
    ) -> EvaluationResult<EntityBody> {
        Ok(self
            .fetcher
            .fetch_in(collection, primary_key, fetch)?
            .unwrap_or_else(|| EntityBody::reference(collection, primary_key)))
    }
}

/// Position of each primary key in a sorted list
fn positions(order: &[u32]) -> HashMap<u32, usize> {
    order.iter().enumerate().map(|(i, pk)| (*pk, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_toggles_are_immutable() {
        let mut selection = FacetSelection::default();
        selection.insert("brand", 1);
        let added = selection.with("brand", 2);
        let removed = added.without("brand", 1);

        assert!(selection.contains("brand", 1));
        assert!(!selection.contains("brand", 2));
        assert!(added.contains("brand", 2));
        assert!(!removed.contains("brand", 1));
        assert!(removed.contains("brand", 2));
        assert!(added.without_all("brand", [1, 2]).is_empty());
    }
}
