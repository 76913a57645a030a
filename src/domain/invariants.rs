//! Consistency checks for a whole forest snapshot.

use itertools::Itertools;
use tracing::instrument;

use crate::domain::builder::{TreeBuilder, TreeLinks};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node_info::NodeInfo;

/// Summary of a verified forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForestStats {
    pub trees: usize,
    pub nodes: usize,
}

/// Verify every nested-set invariant over rows ordered by `(root_id, left)`.
///
/// On top of what [`TreeBuilder`] enforces while linking, this checks that
/// each list-top is a level-0 root, that siblings are disjoint and ordered,
/// and that each node's width is exactly twice its subtree size.
#[instrument(level = "debug", skip(nodes), fields(len = nodes.len()))]
pub fn verify_forest<T: NodeInfo>(nodes: &[&T]) -> DomainResult<ForestStats> {
    let links = TreeBuilder::new().link(nodes)?;

    for &top in &links.tops {
        let root = nodes[top];
        if root.level() != 0 {
            return Err(DomainError::LevelMismatch {
                id: root.id().unwrap_or_default(),
                level: root.level(),
                expected: 0,
            });
        }
    }

    for siblings in links.children.iter().flatten() {
        for (&a, &b) in siblings.iter().tuple_windows() {
            if nodes[a].right() >= nodes[b].left() {
                return Err(DomainError::Overlap {
                    id: nodes[b].id().unwrap_or_default(),
                    left: nodes[b].left(),
                    right: nodes[b].right(),
                    parent: nodes[a].id().unwrap_or_default(),
                    parent_left: nodes[a].left(),
                    parent_right: nodes[a].right(),
                });
            }
        }
    }

    let sizes = subtree_sizes(&links);
    for (position, node) in nodes.iter().enumerate() {
        let count = sizes[position];
        if node.width() != 2 * count as i64 {
            return Err(DomainError::WidthMismatch {
                id: node.id().unwrap_or_default(),
                width: node.width(),
                count,
            });
        }
    }

    Ok(ForestStats {
        trees: links.tops.len(),
        nodes: nodes.len(),
    })
}

/// Subtree size (node itself included) per list position.
///
/// Children always follow their parent in the list, so one reverse sweep
/// accumulates sizes bottom-up.
fn subtree_sizes(links: &TreeLinks) -> Vec<usize> {
    let mut sizes = vec![1usize; links.parents.len()];
    for position in (0..links.parents.len()).rev() {
        if let Some(parent) = links.parents[position] {
            sizes[parent] += sizes[position];
        }
    }
    sizes
}
