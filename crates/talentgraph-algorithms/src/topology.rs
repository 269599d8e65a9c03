//! Hierarchy topology checks
//!
//! Cycle detection over parent links.

use super::common::{HierarchyView, NodeId};

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Find every cycle formed by parent links.
///
/// Three-color walk: each node is walked upward at most once. Reaching a
/// node that is gray (on the current walk) closes a cycle; reaching a black
/// node means the rest of the path was already classified. Because every
/// node has at most one parent, each cycle is found exactly once.
///
/// Each returned cycle is sorted by id; cycles are ordered by their
/// smallest member.
pub fn find_parent_cycles(view: &HierarchyView) -> Vec<Vec<NodeId>> {
    let n = view.node_count;
    let mut color = vec![Color::White; n];
    let mut cycles = Vec::new();

    for start in 0..n {
        if color[start] != Color::White {
            continue;
        }

        let mut path = Vec::new();
        let mut current = Some(start);

        while let Some(idx) = current {
            if color[idx] != Color::White {
                break;
            }
            color[idx] = Color::Gray;
            path.push(idx);
            current = view.parent(idx);
        }

        if let Some(idx) = current {
            if color[idx] == Color::Gray {
                let pos = path.iter().position(|&p| p == idx).unwrap_or(0);
                let mut cycle: Vec<NodeId> =
                    path[pos..].iter().map(|&i| view.index_to_node[i]).collect();
                cycle.sort_unstable();
                cycles.push(cycle);
            }
        }

        for idx in path {
            color[idx] = Color::Black;
        }
    }

    cycles.sort_by_key(|c| c.first().copied());
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acyclic_forest() {
        let view = HierarchyView::from_parent_links(&[
            (1, None),
            (2, Some(1)),
            (3, Some(2)),
            (10, None),
            (11, Some(10)),
        ]);
        assert!(find_parent_cycles(&view).is_empty());
    }

    #[test]
    fn test_two_cycles_with_tails() {
        // Loop A: 1 -> 2 -> 3 -> 1, tail 4 -> 1
        // Loop B: 7 <-> 8, tail 9 -> 7
        let view = HierarchyView::from_parent_links(&[
            (4, Some(1)),
            (1, Some(2)),
            (2, Some(3)),
            (3, Some(1)),
            (9, Some(7)),
            (7, Some(8)),
            (8, Some(7)),
            (5, None),
        ]);

        let cycles = find_parent_cycles(&view);
        assert_eq!(cycles, vec![vec![1, 2, 3], vec![7, 8]]);
    }
}
