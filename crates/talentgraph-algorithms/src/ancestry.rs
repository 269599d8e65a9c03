//! Upward traversal
//!
//! Walks parent links from a node toward its root.

use super::common::{HierarchyView, NodeId};
use std::collections::HashSet;

/// Result of walking parent links upward
#[derive(Debug, Clone, PartialEq)]
pub struct AncestorPath {
    pub start: NodeId,
    /// Ancestors from the immediate parent upward, excluding `start`
    pub path: Vec<NodeId>,
    /// Nodes of the cycle the walk ran into, if any
    pub cycle: Option<Vec<NodeId>>,
}

impl AncestorPath {
    pub fn is_cyclic(&self) -> bool {
        self.cycle.is_some()
    }
}

/// Walk from `start` to its root.
///
/// The walk keeps a visited set and stops the first time a node repeats,
/// so it terminates on any input. The repeated section is reported as the
/// cycle and is not included in `path` beyond its first visit.
pub fn ancestor_path(view: &HierarchyView, start: NodeId) -> Option<AncestorPath> {
    let start_idx = view.index_of(start)?;

    let mut visited = HashSet::new();
    let mut order = vec![start_idx];
    visited.insert(start_idx);

    let mut current = view.parent(start_idx);
    let mut cycle = None;

    while let Some(idx) = current {
        if !visited.insert(idx) {
            // Everything from the first occurrence of `idx` onward is the loop
            let pos = order.iter().position(|&o| o == idx).unwrap_or(0);
            let mut members: Vec<NodeId> = order[pos..]
                .iter()
                .map(|&i| view.index_to_node[i])
                .collect();
            members.sort_unstable();
            cycle = Some(members);
            break;
        }
        order.push(idx);
        current = view.parent(idx);
    }

    let path = order[1..].iter().map(|&i| view.index_to_node[i]).collect();

    Some(AncestorPath {
        start,
        path,
        cycle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_to_root() {
        // 1 <- 2 <- 3 <- 4
        let view = HierarchyView::from_parent_links(&[
            (1, None),
            (2, Some(1)),
            (3, Some(2)),
            (4, Some(3)),
        ]);

        let result = ancestor_path(&view, 4).unwrap();
        assert_eq!(result.path, vec![3, 2, 1]);
        assert!(!result.is_cyclic());

        let root = ancestor_path(&view, 1).unwrap();
        assert!(root.path.is_empty());
    }

    #[test]
    fn test_walk_terminates_on_cycle() {
        // 1 -> 2 -> 3 -> 1, and 4 hangs below the loop
        let view = HierarchyView::from_parent_links(&[
            (1, Some(3)),
            (2, Some(1)),
            (3, Some(2)),
            (4, Some(3)),
        ]);

        let result = ancestor_path(&view, 4).unwrap();
        assert_eq!(result.cycle, Some(vec![1, 2, 3]));
        assert_eq!(result.path, vec![3, 2, 1]);

        let inside = ancestor_path(&view, 2).unwrap();
        assert_eq!(inside.cycle, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_unknown_start() {
        let view = HierarchyView::from_parent_links(&[(1, None)]);
        assert!(ancestor_path(&view, 42).is_none());
    }
}
