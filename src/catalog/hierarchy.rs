//! Arena-backed hierarchy forest
//!
//! Nodes are addressed by dense indices into one vector; parent and
//! children are stored as indices. Primary keys map to indices through a
//! lookup table.

use std::collections::HashMap;

use super::errors::{CatalogError, CatalogResult};
use super::index::HierarchyIndex;
use super::value::Scalar;

type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    primary_key: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    level: usize,
}

/// Placement of one entity as supplied to [`HierarchyTree::build`]
#[derive(Debug, Clone)]
pub struct Placement {
    pub primary_key: u32,
    pub parent: Option<u32>,
    /// Value of the sibling-order attribute, if declared and present
    pub order: Option<Scalar>,
}

/// Forest of one hierarchical collection
#[derive(Debug, Clone, Default)]
pub struct HierarchyTree {
    nodes: Vec<NodeId>,
    arena: Vec<Node>,
    index_of: HashMap<u32, NodeId>,
    roots: Vec<NodeId>,
    orphans: Vec<u32>,
}

impl HierarchyTree {
    /// Builds the forest from placements given in insertion order.
    ///
    /// Siblings are ordered by `order` (missing values last), then by
    /// insertion order. Nodes whose parent is absent become orphans along
    /// with their whole subtree. Cycles are rejected.
    pub fn build(collection: &str, placements: Vec<Placement>) -> CatalogResult<Self> {
        let mut arena: Vec<Node> = Vec::with_capacity(placements.len());
        let mut index_of = HashMap::with_capacity(placements.len());
        for placement in &placements {
            index_of.insert(placement.primary_key, arena.len());
            arena.push(Node {
                primary_key: placement.primary_key,
                parent: None,
                children: Vec::new(),
                level: 0,
            });
        }

        let mut roots = Vec::new();
        let mut detached = Vec::new();
        for (id, placement) in placements.iter().enumerate() {
            match placement.parent {
                None => roots.push(id),
                Some(parent_pk) if parent_pk == placement.primary_key => {
                    return Err(CatalogError::HierarchyCycle {
                        collection: collection.to_string(),
                        primary_key: parent_pk,
                    });
                }
                Some(parent_pk) => match index_of.get(&parent_pk) {
                    Some(&parent) => {
                        arena[id].parent = Some(parent);
                        arena[parent].children.push(id);
                    }
                    None => detached.push(id),
                },
            }
        }

        let sort_key = |id: &NodeId| (placements[*id].order.is_none(), placements[*id].order.clone(), *id);
        roots.sort_by_key(sort_key);
        for node in arena.iter_mut() {
            node.children.sort_by_key(sort_key);
        }

        // Levels and reachability from roots
        let mut reached = vec![false; arena.len()];
        let mut stack: Vec<(NodeId, usize)> = roots.iter().rev().map(|&r| (r, 1)).collect();
        while let Some((id, level)) = stack.pop() {
            reached[id] = true;
            arena[id].level = level;
            for &child in arena[id].children.iter().rev() {
                stack.push((child, level + 1));
            }
        }

        // Whatever is unreached either hangs below a detached node or sits on a cycle
        let mut orphaned = vec![false; arena.len()];
        let mut stack: Vec<NodeId> = detached.clone();
        while let Some(id) = stack.pop() {
            orphaned[id] = true;
            stack.extend(arena[id].children.iter().copied());
        }
        if let Some(id) = (0..arena.len()).find(|&id| !reached[id] && !orphaned[id]) {
            return Err(CatalogError::HierarchyCycle {
                collection: collection.to_string(),
                primary_key: arena[id].primary_key,
            });
        }

        let orphans = (0..arena.len())
            .filter(|&id| orphaned[id])
            .map(|id| arena[id].primary_key)
            .collect();
        let nodes = (0..arena.len()).filter(|&id| reached[id]).collect();

        Ok(Self {
            nodes,
            arena,
            index_of,
            roots,
            orphans,
        })
    }

    /// Primary keys outside the forest
    pub fn orphans(&self) -> &[u32] {
        &self.orphans
    }

    /// Number of nodes attached to the forest
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn attached(&self, primary_key: u32) -> Option<&Node> {
        let id = *self.index_of.get(&primary_key)?;
        let node = &self.arena[id];
        (node.level > 0).then_some(node)
    }
}

impl HierarchyIndex for HierarchyTree {
    fn roots(&self) -> Vec<u32> {
        self.roots
            .iter()
            .map(|&id| self.arena[id].primary_key)
            .collect()
    }

    fn contains(&self, primary_key: u32) -> bool {
        self.attached(primary_key).is_some()
    }

    fn parent_of(&self, primary_key: u32) -> Option<u32> {
        let node = self.attached(primary_key)?;
        node.parent.map(|p| self.arena[p].primary_key)
    }

    fn children_of(&self, primary_key: u32) -> Vec<u32> {
        self.attached(primary_key)
            .map(|node| {
                node.children
                    .iter()
                    .map(|&c| self.arena[c].primary_key)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn level_of(&self, primary_key: u32) -> Option<usize> {
        self.attached(primary_key).map(|node| node.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::errors::CatalogErrorCode;

    fn place(primary_key: u32, parent: Option<u32>) -> Placement {
        Placement {
            primary_key,
            parent,
            order: None,
        }
    }

    #[test]
    fn test_build_forest() {
        let tree = HierarchyTree::build(
            "Category",
            vec![
                place(1, None),
                place(2, Some(1)),
                place(3, Some(1)),
                place(4, Some(2)),
                place(5, None),
            ],
        )
        .unwrap();

        assert_eq!(tree.roots(), vec![1, 5]);
        assert_eq!(tree.children_of(1), vec![2, 3]);
        assert_eq!(tree.parent_of(4), Some(2));
        assert_eq!(tree.level_of(4), Some(3));
        assert_eq!(tree.level_of(5), Some(1));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_orphans_stay_outside_forest() {
        let tree = HierarchyTree::build(
            "Category",
            vec![place(1, None), place(2, Some(99)), place(3, Some(2))],
        )
        .unwrap();

        assert_eq!(tree.orphans(), &[2, 3]);
        assert!(!tree.contains(2));
        assert!(!tree.contains(3));
        assert!(tree.children_of(2).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_cycle_rejected() {
        let err = HierarchyTree::build(
            "Category",
            vec![place(1, None), place(2, Some(3)), place(3, Some(2))],
        )
        .unwrap_err();
        assert_eq!(err.code(), CatalogErrorCode::HierarchyCycle);
    }

    #[test]
    fn test_self_parent_rejected() {
        assert!(HierarchyTree::build("Category", vec![place(1, Some(1))]).is_err());
    }

    #[test]
    fn test_sibling_order_by_attribute_then_insertion() {
        let tree = HierarchyTree::build(
            "Category",
            vec![
                place(1, None),
                Placement {
                    primary_key: 2,
                    parent: Some(1),
                    order: Some(Scalar::Int(20)),
                },
                place(3, Some(1)),
                Placement {
                    primary_key: 4,
                    parent: Some(1),
                    order: Some(Scalar::Int(10)),
                },
            ],
        )
        .unwrap();

        assert_eq!(tree.children_of(1), vec![4, 2, 3]);
    }
}
