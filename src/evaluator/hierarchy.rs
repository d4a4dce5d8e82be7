//! Hierarchy resolver: scoping by `hierarchyWithin` and `hierarchyWithinRoot`
//!
//! A node is visible when it and every ancestor pass the `having` and
//! `excluding` refinements, so a failing node removes its whole subtree.
//! Scope nodes are then selected among visible nodes:
//!
//! | refinement       | self hierarchy            | referenced hierarchy        |
//! |------------------|---------------------------|-----------------------------|
//! | none             | anchor and descendants    | anchor and descendants      |
//! | `excludingRoot`  | descendants only          | descendants only            |
//! | `directRelation` | children of the anchor    | the anchor itself           |
//!
//! Without an anchor (`hierarchyWithinRoot`) every visible node is in
//! scope, or only the roots under `directRelation`.

use roaring::RoaringBitmap;

use super::context::QueryContext;
use super::errors::{EvaluationError, EvaluationResult};
use super::filter::FilterEvaluator;
use crate::catalog::{CollectionIndex, HierarchyIndex};
use crate::query::{FilterBy, FilterConstraint, HierarchySpecification, QueryError};

/// Resolved scope of one hierarchy constraint
#[derive(Debug, Clone)]
pub struct HierarchyScope {
    /// `None` for scopes anchored at the virtual root
    pub anchors: Option<RoaringBitmap>,
    pub visible: RoaringBitmap,
    /// Hierarchy nodes in scope
    pub nodes: RoaringBitmap,
}

impl HierarchyScope {
    /// Entities of the queried collection placed in scope
    pub fn candidates(&self, resolver: &HierarchyResolver<'_, '_>) -> RoaringBitmap {
        resolver.holders(&self.nodes)
    }
}

/// Resolves hierarchy scopes of the queried collection or of a reference
pub struct HierarchyResolver<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    queried: &'a dyn CollectionIndex,
    reference: Option<String>,
    nodes: &'a dyn CollectionIndex,
    tree: &'a dyn HierarchyIndex,
}

impl<'c, 'a> HierarchyResolver<'c, 'a> {
    pub fn new(
        ctx: &'c QueryContext<'a>,
        queried: &'a dyn CollectionIndex,
        reference: Option<&str>,
    ) -> EvaluationResult<Self> {
        let nodes = match reference {
            None => queried,
            Some(name) => {
                let schema = queried.schema();
                let declared = schema.reference(name).ok_or_else(|| {
                    EvaluationError::Query(QueryError::UnknownReference {
                        collection: schema.name.clone(),
                        reference: name.to_string(),
                    })
                })?;
                ctx.collection(&declared.referenced_entity_type)?
            }
        };
        let tree = nodes.hierarchy().ok_or_else(|| {
            EvaluationError::Query(QueryError::NotHierarchical(nodes.schema().name.clone()))
        })?;
        Ok(Self {
            ctx,
            queried,
            reference: reference.map(str::to_string),
            nodes,
            tree,
        })
    }

    pub fn tree(&self) -> &'a dyn HierarchyIndex {
        self.tree
    }

    /// Collection holding the hierarchy nodes
    pub fn nodes_collection(&self) -> &'a dyn CollectionIndex {
        self.nodes
    }

    pub fn is_self(&self) -> bool {
        self.reference.is_none()
    }

    /// Evaluates a filter over the hierarchy nodes
    pub fn filter_nodes(&self, filter_by: &FilterBy) -> EvaluationResult<RoaringBitmap> {
        let evaluated = FilterEvaluator::new(self.ctx, self.nodes).evaluate(filter_by);
        match (&self.reference, evaluated) {
            (Some(_), Err(e)) => Err(EvaluationError::nested(&self.nodes.schema().name, e)),
            (_, result) => result,
        }
    }

    /// Nodes matching the anchor predicate that are part of the forest
    pub fn anchors(&self, of: &FilterConstraint) -> EvaluationResult<RoaringBitmap> {
        let matched = self.filter_nodes(&FilterBy::new(vec![of.clone()]))?;
        Ok(matched.iter().filter(|pk| self.tree.contains(*pk)).collect())
    }

    /// Nodes that pass every `having` and `excluding` refinement on their
    /// whole root path
    pub fn visible(&self, specification: &[HierarchySpecification]) -> EvaluationResult<RoaringBitmap> {
        let mut having: Option<RoaringBitmap> = None;
        let mut excluded = RoaringBitmap::new();
        for spec in specification {
            match spec {
                HierarchySpecification::Having(filter) => {
                    let matched = self.filter_nodes(&FilterBy::new(filter.clone()))?;
                    having = Some(match having {
                        Some(h) => h & matched,
                        None => matched,
                    });
                }
                HierarchySpecification::Excluding(filter) => {
                    excluded |= self.filter_nodes(&FilterBy::new(filter.clone()))?;
                }
                HierarchySpecification::DirectRelation | HierarchySpecification::ExcludingRoot => {}
            }
        }

        let mut visible = RoaringBitmap::new();
        let mut stack = self.tree.roots();
        stack.reverse();
        while let Some(pk) = stack.pop() {
            let passes = !excluded.contains(pk) && having.as_ref().map_or(true, |h| h.contains(pk));
            if passes {
                visible.insert(pk);
                stack.extend(self.tree.children_of(pk).into_iter().rev());
            }
        }
        Ok(visible)
    }

    /// Node and its visible descendants, pre-order
    pub fn subtree(&self, root: u32, visible: &RoaringBitmap) -> Vec<u32> {
        let mut found = Vec::new();
        if !visible.contains(root) {
            return found;
        }
        let mut stack = vec![root];
        while let Some(pk) = stack.pop() {
            found.push(pk);
            stack.extend(
                self.tree
                    .children_of(pk)
                    .into_iter()
                    .rev()
                    .filter(|c| visible.contains(*c)),
            );
        }
        found
    }

    /// Resolves a scope; `None` anchors it at the virtual root
    pub fn scope(
        &self,
        of: Option<&FilterConstraint>,
        specification: &[HierarchySpecification],
    ) -> EvaluationResult<HierarchyScope> {
        let visible = self.visible(specification)?;
        let direct = specification
            .iter()
            .any(|s| matches!(s, HierarchySpecification::DirectRelation));
        let excluding_root = specification
            .iter()
            .any(|s| matches!(s, HierarchySpecification::ExcludingRoot));

        let Some(of) = of else {
            let nodes = if direct {
                self.tree
                    .roots()
                    .into_iter()
                    .filter(|r| visible.contains(*r))
                    .collect()
            } else {
                visible.clone()
            };
            return Ok(HierarchyScope {
                anchors: None,
                visible,
                nodes,
            });
        };

        let anchors = self.anchors(of)?;
        let mut nodes = RoaringBitmap::new();
        for anchor in anchors.iter().filter(|a| visible.contains(*a)) {
            match (direct, self.is_self()) {
                (true, true) => nodes.extend(
                    self.tree
                        .children_of(anchor)
                        .into_iter()
                        .filter(|c| visible.contains(*c)),
                ),
                (true, false) => {
                    if !excluding_root {
                        nodes.insert(anchor);
                    }
                }
                (false, _) => {
                    nodes.extend(self.subtree(anchor, &visible));
                    if excluding_root {
                        nodes.remove(anchor);
                    }
                }
            }
        }
        Ok(HierarchyScope {
            anchors: Some(anchors),
            visible,
            nodes,
        })
    }

    /// Entities of the queried collection placed on any of the nodes
    pub fn holders(&self, nodes: &RoaringBitmap) -> RoaringBitmap {
        match &self.reference {
            None => nodes.clone(),
            Some(name) => {
                let references = self.queried.references();
                nodes
                    .iter()
                    .fold(RoaringBitmap::new(), |acc, n| acc | references.referencing(name, n))
            }
        }
    }
}
