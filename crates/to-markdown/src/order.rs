//! Traversal order for the replacement pass.

use std::collections::VecDeque;

use crate::tree::{NodeId, NodeKind, Tree};

/// Breadth-first list of every element strictly under `root`.
///
/// The converter walks this list back to front. Breadth-first order visits
/// all nodes of depth `d` before any node of depth `d + 1`, so the reversed
/// list puts every element after all of its descendants: by the time an
/// element is replaced, its subtree has already been rewritten.
pub fn bfs_order(tree: &Tree, root: NodeId) -> Vec<NodeId> {
    let mut queue = VecDeque::from([root]);
    let mut order = Vec::new();

    while let Some(id) = queue.pop_front() {
        order.push(id);
        for child in tree.children(id) {
            if tree.kind(child) == NodeKind::Element {
                queue.push_back(child);
            }
        }
    }

    // The root itself is never replaced.
    order.remove(0);
    order
}
