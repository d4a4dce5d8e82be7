//! Hierarchy statistics: the axis trees of `hierarchyOfSelf` and
//! `hierarchyOfReference`
//!
//! Every hierarchy is rendered over its present nodes. A node is present
//! when it is visible under the `having`/`excluding` refinements of the
//! query's scope constraint and, for self hierarchies, matches the rest of
//! the filter. Under `removeEmpty` a referenced node must also hold at least
//! one queried entity in its subtree.
//!
//! Counts are taken over the query filter without the hierarchy's own scope
//! constraint, optionally also without the user filter.

use std::collections::{BTreeMap, HashMap};

use roaring::RoaringBitmap;
use serde::Serialize;

use super::context::QueryContext;
use super::errors::{EvaluationError, EvaluationResult};
use super::fetch::{EntityBody, EntityFetcher};
use super::filter::FilterEvaluator;
use super::hierarchy::{HierarchyResolver, HierarchyScope};
use crate::catalog::CollectionIndex;
use crate::query::{
    AxisSpec, EmptyHierarchicalEntityBehaviour, FilterBy, FilterConstraint, HierarchyRequirement,
    OrderBy, Require, StatisticsBase, StatisticsType, StopAt,
};

/// One node of an axis tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub entity: EntityBody,
    /// The node is an anchor of the query's scope constraint
    pub requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queried_entity_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_count: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LevelInfo>,
}

/// Hierarchy extra result, axis trees keyed by output name
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hierarchy {
    #[serde(rename = "self", skip_serializing_if = "BTreeMap::is_empty")]
    pub self_hierarchy: BTreeMap<String, Vec<LevelInfo>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, BTreeMap<String, Vec<LevelInfo>>>,
}

impl Hierarchy {
    pub fn of_self(&self, output_name: &str) -> Option<&[LevelInfo]> {
        self.self_hierarchy.get(output_name).map(Vec::as_slice)
    }

    pub fn of_reference(&self, reference: &str, output_name: &str) -> Option<&[LevelInfo]> {
        self.references
            .get(reference)
            .and_then(|axes| axes.get(output_name))
            .map(Vec::as_slice)
    }
}

/// Where rendering of an axis stops
enum Limit {
    Unlimited,
    Distance(u32),
    Level(u32),
    Node(RoaringBitmap),
}

/// Present nodes of one hierarchy together with their counts
struct Forest<'r, 'c, 'a> {
    ctx: &'c QueryContext<'a>,
    resolver: &'r HierarchyResolver<'c, 'a>,
    fetcher: &'r EntityFetcher<'c, 'a>,
    order_by: &'r OrderBy,
    scope: HierarchyScope,
    present: RoaringBitmap,
    complete_counts: HashMap<u32, u64>,
    without_user_counts: Option<HashMap<u32, u64>>,
}

impl Forest<'_, '_, '_> {
    /// Present children in sibling order; `None` lists the roots
    fn children(&self, parent: Option<u32>) -> Vec<u32> {
        let tree = self.resolver.tree();
        let nodes: Vec<u32> = match parent {
            Some(pk) => tree.children_of(pk),
            None => tree.roots(),
        }
        .into_iter()
        .filter(|pk| self.present.contains(*pk))
        .collect();
        if self.order_by.is_empty() {
            return nodes;
        }
        let ids: RoaringBitmap = nodes.iter().copied().collect();
        super::order::OrderEvaluator::new(self.ctx, self.resolver.nodes_collection())
            .sort(&ids, self.order_by, None)
    }

    /// Present nodes in pre-order
    fn pre_order(&self) -> Vec<u32> {
        self.children(None)
            .into_iter()
            .flat_map(|root| self.resolver.subtree(root, &self.present))
            .collect()
    }

    fn anchors(&self) -> Vec<u32> {
        match &self.scope.anchors {
            Some(anchors) => self
                .pre_order()
                .into_iter()
                .filter(|pk| anchors.contains(*pk))
                .collect(),
            None => Vec::new(),
        }
    }

    fn limit(&self, stop_at: Option<&StopAt>, default: Limit) -> EvaluationResult<Limit> {
        Ok(match stop_at {
            None => default,
            Some(StopAt::Distance(n)) => Limit::Distance(*n),
            Some(StopAt::Level(n)) => Limit::Level(*n),
            Some(StopAt::Node(filter_by)) => Limit::Node(self.resolver.filter_nodes(filter_by)?),
        })
    }

    fn admits(&self, limit: &Limit, pk: u32, distance: u32) -> bool {
        match limit {
            Limit::Unlimited => true,
            Limit::Distance(max) => distance <= *max,
            Limit::Level(max) => self
                .resolver
                .tree()
                .level_of(pk)
                .map_or(false, |level| level <= *max as usize),
            Limit::Node(stop) => !stop.contains(pk),
        }
    }

    fn axis(&self, requirement: &HierarchyRequirement) -> EvaluationResult<Vec<LevelInfo>> {
        let axis = requirement.axis();
        match requirement {
            HierarchyRequirement::FromRoot(_) => {
                let limit = self.limit(axis.stop_at.as_ref(), Limit::Unlimited)?;
                self.render(&self.children(None), 1, axis, &limit, None)
            }
            HierarchyRequirement::FromNode(spec) => {
                let pivots = self.resolver.filter_nodes(&spec.node)?;
                let limit = self.limit(axis.stop_at.as_ref(), Limit::Unlimited)?;
                match self.pre_order().into_iter().find(|pk| pivots.contains(*pk)) {
                    Some(pivot) => self.render(&self.children(Some(pivot)), 1, axis, &limit, None),
                    None => Ok(Vec::new()),
                }
            }
            HierarchyRequirement::Children(_) => {
                let limit = self.limit(axis.stop_at.as_ref(), Limit::Unlimited)?;
                if self.scope.anchors.is_none() {
                    return self.render(&self.children(None), 1, axis, &limit, None);
                }
                let mut levels = Vec::new();
                for anchor in self.anchors() {
                    levels.extend(self.render(&self.children(Some(anchor)), 1, axis, &limit, None)?);
                }
                Ok(levels)
            }
            HierarchyRequirement::Parents(_) => {
                let limit = self.limit(axis.stop_at.as_ref(), Limit::Unlimited)?;
                let chain = self.parent_chains(&limit);
                let starts: Vec<u32> = self
                    .pre_order()
                    .into_iter()
                    .filter(|pk| {
                        chain.contains(*pk)
                            && self
                                .resolver
                                .tree()
                                .parent_of(*pk)
                                .map_or(true, |parent| !chain.contains(parent))
                    })
                    .collect();
                self.render(&starts, 1, axis, &Limit::Unlimited, Some(&chain))
            }
            HierarchyRequirement::Siblings(_) => {
                let limit = self.limit(axis.stop_at.as_ref(), Limit::Distance(1))?;
                let tree = self.resolver.tree();
                let mut siblings: Vec<u32> = Vec::new();
                for anchor in self.anchors() {
                    for sibling in self.children(tree.parent_of(anchor)) {
                        if sibling != anchor && !siblings.contains(&sibling) {
                            siblings.push(sibling);
                        }
                    }
                }
                self.render(&siblings, 1, axis, &limit, None)
            }
        }
    }

    /// Anchors and their ancestors within the limit, measured upwards
    fn parent_chains(&self, limit: &Limit) -> RoaringBitmap {
        let tree = self.resolver.tree();
        let mut chain = RoaringBitmap::new();
        for anchor in self.anchors() {
            let mut current = Some(anchor);
            let mut distance = 0;
            while let Some(pk) = current {
                if !self.present.contains(pk) {
                    break;
                }
                let within = match limit {
                    Limit::Node(stop) => distance == 0 || !stop.contains(pk),
                    other => self.admits(other, pk, distance),
                };
                match (within, limit) {
                    (true, _) => {
                        chain.insert(pk);
                    }
                    // deeper ancestors are skipped, shallower ones stay
                    (false, Limit::Level(_)) => {}
                    (false, _) => break,
                }
                current = tree.parent_of(pk);
                distance += 1;
            }
        }
        chain
    }

    fn render(
        &self,
        nodes: &[u32],
        distance: u32,
        axis: &AxisSpec,
        limit: &Limit,
        allowed: Option<&RoaringBitmap>,
    ) -> EvaluationResult<Vec<LevelInfo>> {
        let mut levels = Vec::new();
        for &pk in nodes {
            if !self.admits(limit, pk, distance) || allowed.map_or(false, |a| !a.contains(pk)) {
                continue;
            }
            let present_children = self.children(Some(pk));
            let entity = self
                .fetcher
                .fetch(self.resolver.nodes_collection(), pk, axis.entity_fetch.as_ref())?
                .ok_or_else(|| EvaluationError::SnapshotInconsistency {
                    collection: self.resolver.nodes_collection().schema().name.clone(),
                    primary_key: pk,
                })?;
            let statistics = axis.statistics.as_ref();
            let queried_entity_count = statistics
                .filter(|s| s.wants(StatisticsType::QueriedEntityCount))
                .map(|s| {
                    let counts = match s.base {
                        StatisticsBase::CompleteFilter => Some(&self.complete_counts),
                        StatisticsBase::WithoutUserFilter => self.without_user_counts.as_ref(),
                    };
                    counts.and_then(|c| c.get(&pk).copied()).unwrap_or(0)
                });
            let children_count = statistics
                .filter(|s| s.wants(StatisticsType::ChildrenCount))
                .map(|_| present_children.len() as u64);
            levels.push(LevelInfo {
                entity,
                requested: self.scope.anchors.as_ref().map_or(false, |a| a.contains(pk)),
                queried_entity_count,
                children_count,
                children: self.render(&present_children, distance + 1, axis, limit, allowed)?,
            });
        }
        Ok(levels)
    }
}

/// Computes the hierarchy extra result of a query
pub struct HierarchyStatistics<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    collection: &'a dyn CollectionIndex,
    filter_by: &'c FilterBy,
    fetcher: &'c EntityFetcher<'c, 'a>,
}

impl<'c, 'a> HierarchyStatistics<'c, 'a> {
    pub fn new(
        ctx: &'c QueryContext<'a>,
        collection: &'a dyn CollectionIndex,
        filter_by: &'c FilterBy,
        fetcher: &'c EntityFetcher<'c, 'a>,
    ) -> Self {
        Self {
            ctx,
            collection,
            filter_by,
            fetcher,
        }
    }

    /// Axis trees of every requested hierarchy, `None` when none is requested
    pub fn compute(&self, require: &Require) -> EvaluationResult<Option<Hierarchy>> {
        let of_self = require.hierarchy_of_self();
        let of_references: Vec<_> = require.hierarchies_of_reference().collect();
        if of_self.is_none() && of_references.is_empty() {
            return Ok(None);
        }

        let mut hierarchy = Hierarchy::default();
        if let Some(spec) = of_self {
            hierarchy.self_hierarchy = self.axes(
                None,
                &spec.order_by,
                EmptyHierarchicalEntityBehaviour::LeaveEmpty,
                &spec.requirements,
            )?;
        }
        for spec in of_references {
            let axes = self.axes(
                Some(&spec.name),
                &spec.order_by,
                spec.empty_behaviour,
                &spec.requirements,
            )?;
            hierarchy.references.insert(spec.name.clone(), axes);
        }
        Ok(Some(hierarchy))
    }

    fn axes(
        &self,
        reference: Option<&str>,
        order_by: &OrderBy,
        empty_behaviour: EmptyHierarchicalEntityBehaviour,
        requirements: &[HierarchyRequirement],
    ) -> EvaluationResult<BTreeMap<String, Vec<LevelInfo>>> {
        let resolver = HierarchyResolver::new(self.ctx, self.collection, reference)?;
        let scope = match self.scoping(reference) {
            Some(FilterConstraint::HierarchyWithin { of, specification, .. }) => {
                resolver.scope(Some(of.as_ref()), specification)?
            }
            Some(FilterConstraint::HierarchyWithinRoot { specification, .. }) => {
                resolver.scope(None, specification)?
            }
            _ => resolver.scope(None, &[])?,
        };

        let unscoped = self.filter_by.without_hierarchy_within(reference);
        let evaluator = FilterEvaluator::new(self.ctx, self.collection);
        let complete = evaluator.evaluate(&unscoped)?;
        let complete_counts = subtree_counts(&resolver, &scope.visible, &complete);
        let wants_without_user = requirements.iter().any(|r| {
            r.axis()
                .statistics
                .as_ref()
                .map_or(false, |s| s.base == StatisticsBase::WithoutUserFilter)
        });
        let without_user_counts = if wants_without_user {
            let base = evaluator.evaluate(&unscoped.without_user_filter())?;
            Some(subtree_counts(&resolver, &scope.visible, &base))
        } else {
            None
        };

        let present: RoaringBitmap = match (reference, empty_behaviour) {
            (None, _) => &scope.visible & &complete,
            (Some(_), EmptyHierarchicalEntityBehaviour::LeaveEmpty) => scope.visible.clone(),
            (Some(_), EmptyHierarchicalEntityBehaviour::RemoveEmpty) => scope
                .visible
                .iter()
                .filter(|pk| complete_counts.get(pk).map_or(false, |c| *c > 0))
                .collect(),
        };
        tracing::debug!(
            reference = reference.unwrap_or("self"),
            present = present.len(),
            "hierarchy forest resolved"
        );

        let forest = Forest {
            ctx: self.ctx,
            resolver: &resolver,
            fetcher: self.fetcher,
            order_by,
            scope,
            present,
            complete_counts,
            without_user_counts,
        };
        let mut axes = BTreeMap::new();
        for requirement in requirements {
            axes.insert(requirement.axis().output_name.clone(), forest.axis(requirement)?);
        }
        Ok(axes)
    }

    /// Scope constraint of the hierarchy in the query filter
    fn scoping(&self, reference: Option<&str>) -> Option<&'c FilterConstraint> {
        self.filter_by.find(|c| match c {
            FilterConstraint::HierarchyWithin { reference: r, .. }
            | FilterConstraint::HierarchyWithinRoot { reference: r, .. } => r.as_deref() == reference,
            _ => false,
        })
    }
}

/// Distinct base entities held by every visible node's subtree
fn subtree_counts(
    resolver: &HierarchyResolver<'_, '_>,
    visible: &RoaringBitmap,
    base: &RoaringBitmap,
) -> HashMap<u32, u64> {
    let tree = resolver.tree();
    let order: Vec<u32> = tree
        .roots()
        .into_iter()
        .flat_map(|root| resolver.subtree(root, visible))
        .collect();
    let mut held: HashMap<u32, RoaringBitmap> = HashMap::with_capacity(order.len());
    for &pk in order.iter().rev() {
        let single: RoaringBitmap = std::iter::once(pk).collect();
        let mut subtree = resolver.holders(&single) & base;
        for child in tree.children_of(pk) {
            if let Some(below) = held.get(&child) {
                subtree |= below;
            }
        }
        held.insert(pk, subtree);
    }
    held.into_iter().map(|(pk, ids)| (pk, ids.len())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        AttributeSchema, AttributeType, Attributes, Catalog, CatalogSnapshot, Entity,
        EntitySchema, MemoryCatalog, Reference, ReferenceSchema,
    };
    use crate::evaluator::config::EvaluatorConfig;
    use crate::query::{
        HierarchyOfReference, HierarchyOfSelf, Query, RequireConstraint, Statistics,
    };

    //  1 ─┬─ 2 ── 4
    //     └─ 3 ── 5
    //  6
    //  9 → 99 (orphan)
    fn catalog() -> MemoryCatalog {
        let categories = EntitySchema::new("Category").hierarchical();
        let nodes = vec![
            Entity::new(1),
            Entity::new(2).with_parent(1),
            Entity::new(3).with_parent(1),
            Entity::new(4).with_parent(2),
            Entity::new(5).with_parent(3),
            Entity::new(6),
            Entity::new(9).with_parent(99),
        ];
        let products = EntitySchema::new("Product")
            .with_attribute(AttributeSchema::new("stock", AttributeType::Int))
            .with_reference(ReferenceSchema::new("categories", "Category"));
        let placed = [(10, 2, 1), (11, 4, 0), (12, 4, 5), (13, 5, 3), (14, 9, 1)]
            .into_iter()
            .map(|(pk, category, stock)| {
                Entity::new(pk)
                    .with_attributes(Attributes::new().with("stock", stock as i64))
                    .with_reference(Reference::new("categories", category))
            })
            .collect();
        MemoryCatalog::from_snapshot(
            CatalogSnapshot::new()
                .with_collection(categories, nodes)
                .with_collection(products, placed),
        )
        .unwrap()
    }

    fn computed(catalog: &MemoryCatalog, query: &Query) -> Hierarchy {
        let config = EvaluatorConfig::default();
        let ctx = QueryContext::new(catalog, &config, query, None);
        let collection = catalog.collection(&query.collection).unwrap();
        let fetcher = EntityFetcher::new(&ctx, collection);
        HierarchyStatistics::new(&ctx, collection, &query.filter_by, &fetcher)
            .compute(&query.require)
            .unwrap()
            .unwrap()
    }

    fn of_categories(
        filter: Vec<FilterConstraint>,
        empty_behaviour: EmptyHierarchicalEntityBehaviour,
        requirements: Vec<HierarchyRequirement>,
    ) -> Query {
        Query::new("Product")
            .filter(filter)
            .require(vec![RequireConstraint::HierarchyOfReference(HierarchyOfReference {
                name: "categories".into(),
                empty_behaviour,
                order_by: OrderBy::default(),
                requirements,
            })])
    }

    fn keys(levels: &[LevelInfo]) -> Vec<u32> {
        levels.iter().map(|l| l.entity.primary_key).collect()
    }

    fn all_stats() -> Statistics {
        Statistics {
            base: StatisticsBase::CompleteFilter,
            types: vec![StatisticsType::QueriedEntityCount, StatisticsType::ChildrenCount],
        }
    }

    #[test]
    fn test_from_root_counts() {
        let catalog = catalog();
        let query = of_categories(
            vec![],
            EmptyHierarchicalEntityBehaviour::LeaveEmpty,
            vec![HierarchyRequirement::FromRoot(
                AxisSpec::named("megaMenu").with_statistics(all_stats()),
            )],
        );
        let hierarchy = computed(&catalog, &query);
        let roots = hierarchy.of_reference("categories", "megaMenu").unwrap();
        assert_eq!(keys(roots), vec![1, 6]);
        assert_eq!(roots[0].queried_entity_count, Some(4));
        assert_eq!(roots[0].children_count, Some(2));
        assert_eq!(roots[1].queried_entity_count, Some(0));
        assert_eq!(keys(&roots[0].children), vec![2, 3]);
        assert_eq!(roots[0].children[0].queried_entity_count, Some(3));
    }

    #[test]
    fn test_remove_empty_prunes_nodes() {
        let catalog = catalog();
        let query = of_categories(
            vec![],
            EmptyHierarchicalEntityBehaviour::RemoveEmpty,
            vec![HierarchyRequirement::FromRoot(AxisSpec::named("menu"))],
        );
        let hierarchy = computed(&catalog, &query);
        assert_eq!(keys(hierarchy.of_reference("categories", "menu").unwrap()), vec![1]);
    }

    #[test]
    fn test_axes_relative_to_anchor() {
        let catalog = catalog();
        let query = of_categories(
            vec![FilterConstraint::hierarchy_within(
                "categories",
                FilterConstraint::primary_keys([2]),
                vec![],
            )],
            EmptyHierarchicalEntityBehaviour::LeaveEmpty,
            vec![
                HierarchyRequirement::Children(AxisSpec::named("children").with_statistics(all_stats())),
                HierarchyRequirement::Parents(AxisSpec::named("parents")),
                HierarchyRequirement::Siblings(AxisSpec::named("siblings").with_statistics(all_stats())),
            ],
        );
        let hierarchy = computed(&catalog, &query);

        let children = hierarchy.of_reference("categories", "children").unwrap();
        assert_eq!(keys(children), vec![4]);
        assert_eq!(children[0].queried_entity_count, Some(2));

        let parents = hierarchy.of_reference("categories", "parents").unwrap();
        assert_eq!(keys(parents), vec![1]);
        assert_eq!(keys(&parents[0].children), vec![2]);
        assert!(parents[0].children[0].requested);
        assert!(!parents[0].requested);

        let siblings = hierarchy.of_reference("categories", "siblings").unwrap();
        assert_eq!(keys(siblings), vec![3]);
        assert!(siblings[0].children.is_empty());
        assert_eq!(siblings[0].children_count, Some(1));
    }

    #[test]
    fn test_without_user_filter_base() {
        let catalog = catalog();
        let stats = |base| Statistics {
            base,
            types: vec![StatisticsType::QueriedEntityCount],
        };
        let query = of_categories(
            vec![FilterConstraint::user_filter(vec![
                FilterConstraint::attribute_greater_than("stock", 2i64),
            ])],
            EmptyHierarchicalEntityBehaviour::LeaveEmpty,
            vec![
                HierarchyRequirement::FromRoot(
                    AxisSpec::named("complete").with_statistics(stats(StatisticsBase::CompleteFilter)),
                ),
                HierarchyRequirement::FromRoot(
                    AxisSpec::named("all").with_statistics(stats(StatisticsBase::WithoutUserFilter)),
                ),
            ],
        );
        let hierarchy = computed(&catalog, &query);
        assert_eq!(
            hierarchy.of_reference("categories", "complete").unwrap()[0].queried_entity_count,
            Some(2)
        );
        assert_eq!(
            hierarchy.of_reference("categories", "all").unwrap()[0].queried_entity_count,
            Some(4)
        );
    }

    #[test]
    fn test_stop_at_level_and_self_hierarchy() {
        let catalog = catalog();
        let query = Query::new("Category").require(vec![RequireConstraint::HierarchyOfSelf(
            HierarchyOfSelf {
                order_by: OrderBy::default(),
                requirements: vec![HierarchyRequirement::FromRoot(
                    AxisSpec::named("roots").stop_at(StopAt::Level(1)),
                )],
            },
        )]);
        let hierarchy = computed(&catalog, &query);
        let roots = hierarchy.of_self("roots").unwrap();
        assert_eq!(keys(roots), vec![1, 6]);
        assert!(roots.iter().all(|r| r.children.is_empty()));
    }
}
