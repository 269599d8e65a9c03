//! Shared utilities for hierarchy algorithms
//!
//! Provides a read-only, dense view of a reports-to forest for algorithm execution.

use std::collections::HashMap;

/// Node Identifier type (u64)
pub type NodeId = u64;

/// A dense, integer-indexed view of a hierarchy.
///
/// Every node has at most one parent. Children are stored in Compressed
/// Sparse Row (CSR) format so that a node's direct children are a slice.
/// Parent links are kept as indices, never as references, so a malformed
/// input containing cycles can be represented without unbounded structures.
pub struct HierarchyView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    pub node_to_index: HashMap<NodeId, usize>,

    /// Children CSR structure
    /// Offsets into `child_targets`. Size = node_count + 1
    pub child_offsets: Vec<usize>,
    /// Contiguous array of child node indices
    pub child_targets: Vec<usize>,

    /// Parent index of each node, `None` for roots and unresolved nodes
    pub parents: Vec<Option<usize>>,
}

impl HierarchyView {
    /// Number of direct children of a node (by index)
    pub fn child_count(&self, idx: usize) -> usize {
        self.child_offsets[idx + 1] - self.child_offsets[idx]
    }

    /// Direct children of a node
    pub fn children(&self, idx: usize) -> &[usize] {
        let start = self.child_offsets[idx];
        let end = self.child_offsets[idx + 1];
        &self.child_targets[start..end]
    }

    /// Parent of a node
    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parents[idx]
    }

    /// Dense index for a node id
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.node_to_index.get(&id).copied()
    }

    /// Build a view from node ids and parent ids.
    ///
    /// `links` pairs every node with its parent id. Parent ids that are not
    /// themselves nodes of the view are dropped, leaving that node parentless.
    /// Children are ordered by node id.
    pub fn from_parent_links(links: &[(NodeId, Option<NodeId>)]) -> Self {
        let node_count = links.len();
        let mut index_to_node = Vec::with_capacity(node_count);
        let mut node_to_index = HashMap::with_capacity(node_count);

        for (idx, &(id, _)) in links.iter().enumerate() {
            index_to_node.push(id);
            node_to_index.insert(id, idx);
        }

        let parents: Vec<Option<usize>> = links
            .iter()
            .map(|(_, parent)| parent.and_then(|p| node_to_index.get(&p).copied()))
            .collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        for (idx, parent) in parents.iter().enumerate() {
            if let Some(p) = parent {
                children[*p].push(idx);
            }
        }

        let mut child_offsets = Vec::with_capacity(node_count + 1);
        let mut child_targets = Vec::with_capacity(node_count);
        child_offsets.push(0);
        for mut list in children {
            list.sort_by_key(|&c| index_to_node[c]);
            child_targets.extend(list);
            child_offsets.push(child_targets.len());
        }

        HierarchyView {
            node_count,
            index_to_node,
            node_to_index,
            child_offsets,
            child_targets,
            parents,
        }
    }
}
