//! Transitive closure over children
//!
//! Computes, for each node, every node reachable by following child links.

use super::common::{HierarchyView, NodeId};
use rayon::prelude::*;

/// Descendants of a single node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Closure {
    /// Reachable node ids, sorted, never including the start node
    pub members: Vec<NodeId>,
    /// True when the walk came back around to the start node
    pub cycle_hit: bool,
}

/// Iterative DFS over child links with an explicit visited set.
pub fn descendants(view: &HierarchyView, start_idx: usize) -> Closure {
    let mut visited = vec![false; view.node_count];
    visited[start_idx] = true;

    let mut stack: Vec<usize> = view.children(start_idx).to_vec();
    let mut members = Vec::new();
    let mut cycle_hit = false;

    while let Some(idx) = stack.pop() {
        if idx == start_idx {
            cycle_hit = true;
            continue;
        }
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        members.push(view.index_to_node[idx]);
        stack.extend_from_slice(view.children(idx));
    }

    members.sort_unstable();
    Closure { members, cycle_hit }
}

/// Closure for every node, indexed like the view.
///
/// Each node's walk is independent, so they run in parallel.
pub fn transitive_closure(view: &HierarchyView) -> Vec<Closure> {
    (0..view.node_count)
        .into_par_iter()
        .map(|idx| descendants(view, idx))
        .collect()
}
