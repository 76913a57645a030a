//! Tree builder: links a left-ordered flat node list in one pass.

use std::collections::HashSet;

use tracing::{instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node_info::NodeInfo;

/// Parent/child wiring computed for a flat list, by list position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeLinks {
    /// Parent position of each element; `None` for list-top elements.
    pub parents: Vec<Option<usize>>,
    /// Child positions of each element in left order; `None` when the
    /// element sits at the level cut-off and its children were not loaded.
    pub children: Vec<Option<Vec<usize>>>,
    /// Positions without a parent inside the list.
    pub tops: Vec<usize>,
    /// Whether an element survived the level cut-off.
    pub included: Vec<bool>,
}

impl TreeLinks {
    fn with_len(len: usize) -> Self {
        Self {
            parents: vec![None; len],
            children: vec![None; len],
            tops: Vec::new(),
            included: vec![false; len],
        }
    }
}

/// Constructs parent/child structure from nodes sorted by left bound.
///
/// Input may contain several trees as long as each tree's rows are
/// contiguous. The list is never modified; on any violation the whole
/// build is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBuilder {
    max_level: Option<u32>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude nodes deeper than `max_level` (absolute level).
    pub fn with_max_level(max_level: Option<u32>) -> Self {
        Self { max_level }
    }

    #[instrument(level = "debug", skip(self, nodes), fields(len = nodes.len()))]
    pub fn link<T: NodeInfo>(&self, nodes: &[&T]) -> DomainResult<TreeLinks> {
        let mut links = TreeLinks::with_len(nodes.len());
        let mut seen_ids = HashSet::with_capacity(nodes.len());
        let mut seen_roots = HashSet::new();
        let mut current_root: Option<i64> = None;
        let mut previous_left: Option<i64> = None;
        // Open ancestors of the current node, innermost last.
        let mut stack: Vec<usize> = Vec::new();

        for (position, node) in nodes.iter().enumerate() {
            let id = node.id().ok_or(DomainError::MissingId { position })?;
            if !seen_ids.insert(id) {
                return Err(DomainError::DuplicateId(id));
            }
            if node.left() >= node.right() {
                return Err(DomainError::InvalidRange {
                    id,
                    left: node.left(),
                    right: node.right(),
                });
            }

            if current_root != Some(node.root_id()) {
                if !seen_roots.insert(node.root_id()) {
                    return Err(DomainError::InterleavedTrees {
                        root_id: node.root_id(),
                    });
                }
                current_root = Some(node.root_id());
                previous_left = None;
                stack.clear();
            }
            if let Some(previous) = previous_left {
                if node.left() <= previous {
                    return Err(DomainError::Unsorted {
                        position,
                        left: node.left(),
                        previous,
                    });
                }
            }
            previous_left = Some(node.left());

            while let Some(&top) = stack.last() {
                if nodes[top].right() < node.left() {
                    stack.pop();
                } else {
                    break;
                }
            }

            if self.max_level.is_some_and(|max| node.level() > max) {
                continue;
            }
            links.included[position] = true;

            match stack.last() {
                Some(&top) => {
                    let parent = nodes[top];
                    if node.right() >= parent.right() {
                        return Err(DomainError::Overlap {
                            id,
                            left: node.left(),
                            right: node.right(),
                            parent: parent.id().unwrap_or_default(),
                            parent_left: parent.left(),
                            parent_right: parent.right(),
                        });
                    }
                    if node.level() != parent.level() + 1 {
                        return Err(DomainError::LevelMismatch {
                            id,
                            level: node.level(),
                            expected: parent.level() + 1,
                        });
                    }
                    links.parents[position] = Some(top);
                    if let Some(siblings) = links.children[top].as_mut() {
                        siblings.push(position);
                    }
                }
                None => links.tops.push(position),
            }

            if self.max_level.map_or(true, |max| node.level() < max) {
                links.children[position] = Some(Vec::new());
            }
            stack.push(position);
        }

        trace!(tops = links.tops.len(), "linked");
        Ok(links)
    }
}
