//! Identity map from stored entities to arena nodes, with linked navigation.

use std::collections::HashMap;

use generational_arena::Arena;
use tracing::{instrument, trace};

use crate::domain::builder::TreeLinks;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Link, Node, NodeId};
use crate::domain::node_info::NodeInfo;

/// Arena of node wrappers keyed by entity id.
///
/// One registry backs one unit of work. Every entity id maps to exactly one
/// [`Node`]; fetching the same row twice yields the same [`NodeId`].
#[derive(Debug)]
pub struct Registry<T> {
    arena: Arena<Node<T>>,
    by_id: HashMap<i64, NodeId>,
}

impl<T: NodeInfo> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NodeInfo> Registry<T> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            by_id: HashMap::new(),
        }
    }

    /// Canonical node for `entity`, created if absent.
    ///
    /// A known entity whose range columns differ from the cached copy
    /// replaces it and loses its links.
    #[instrument(level = "trace", skip(self, entity))]
    pub fn get_node(&mut self, entity: T) -> DomainResult<NodeId> {
        let id = entity.id().ok_or(DomainError::MissingId { position: 0 })?;
        if let Some(&node_id) = self.by_id.get(&id) {
            if let Some(node) = self.arena.get_mut(node_id.0) {
                let moved = node.info.position() != entity.position();
                node.info = entity;
                if moved {
                    trace!(id, "range changed, unlinking");
                    node.unlink();
                }
                return Ok(node_id);
            }
        }
        let node_id = NodeId(self.arena.insert(Node::new(entity)));
        self.by_id.insert(id, node_id);
        Ok(node_id)
    }

    pub fn get(&self, node_id: NodeId) -> Option<&Node<T>> {
        self.arena.get(node_id.0)
    }

    /// Entity wrapped by `node_id`.
    pub fn info(&self, node_id: NodeId) -> Option<&T> {
        self.get(node_id).map(Node::info)
    }

    /// Node registered for an entity id.
    pub fn lookup(&self, entity_id: i64) -> Option<NodeId> {
        self.by_id.get(&entity_id).copied()
    }

    /// All managed nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node<T>)> {
        self.arena.iter().map(|(idx, node)| (NodeId(idx), node))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Forget every node. Persisted rows are not touched.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.by_id.clear();
    }

    pub fn remove(&mut self, node_id: NodeId) -> Option<T> {
        let node = self.arena.remove(node_id.0)?;
        if let Some(id) = node.info.id() {
            self.by_id.remove(&id);
        }
        Some(node.into_info())
    }

    pub(crate) fn unlink(&mut self, node_id: NodeId) {
        if let Some(node) = self.arena.get_mut(node_id.0) {
            node.unlink();
        }
    }

    pub(crate) fn set_parent(&mut self, node_id: NodeId, parent: Option<NodeId>) {
        if let Some(node) = self.arena.get_mut(node_id.0) {
            node.parent = Link::Resolved(parent);
        }
    }

    pub(crate) fn set_children(&mut self, node_id: NodeId, children: Vec<NodeId>) {
        if let Some(node) = self.arena.get_mut(node_id.0) {
            node.children = Link::Resolved(children);
        }
    }

    /// Apply links computed by the tree builder to the nodes they describe.
    ///
    /// List-top nodes keep whatever parent link they had unless they are
    /// roots; nodes dropped by a level cut-off are left untouched.
    pub(crate) fn apply_links(&mut self, node_ids: &[NodeId], links: &TreeLinks) {
        for (position, &node_id) in node_ids.iter().enumerate() {
            if !links.included[position] {
                continue;
            }
            if let Some(parent) = links.parents[position] {
                self.set_parent(node_id, Some(node_ids[parent]));
            } else if self.info(node_id).is_some_and(|info| info.is_root()) {
                self.set_parent(node_id, None);
            }
            match &links.children[position] {
                Some(children) => {
                    let children = children.iter().map(|&c| node_ids[c]).collect();
                    self.set_children(node_id, children);
                }
                None => {
                    if let Some(node) = self.arena.get_mut(node_id.0) {
                        node.children = Link::Unresolved;
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------
    // In-memory navigation; `None` means "not linked yet".
    // ------------------------------------------------------------

    pub fn linked_parent(&self, node_id: NodeId) -> Option<Option<NodeId>> {
        self.get(node_id)?.parent()
    }

    pub fn linked_children(&self, node_id: NodeId) -> Option<&[NodeId]> {
        self.get(node_id)?.children()
    }

    /// Ancestors from the root down to the parent.
    pub fn linked_ancestors(&self, node_id: NodeId) -> Option<Vec<NodeId>> {
        let mut ancestors = Vec::new();
        let mut current = node_id;
        while let Some(parent) = self.linked_parent(current)? {
            ancestors.push(parent);
            current = parent;
        }
        ancestors.reverse();
        Some(ancestors)
    }

    /// Descendants in left order, at most `depth` levels below the node.
    pub fn linked_descendants(&self, node_id: NodeId, depth: Option<u32>) -> Option<Vec<NodeId>> {
        let mut descendants = Vec::new();
        for item in self.iter_subtree(node_id, depth) {
            let (id, _) = item?;
            if id != node_id {
                descendants.push(id);
            }
        }
        Some(descendants)
    }

    /// Other children of the node's parent, in left order. Roots have none.
    pub fn linked_siblings(&self, node_id: NodeId) -> Option<Vec<NodeId>> {
        match self.linked_parent(node_id)? {
            None => Some(Vec::new()),
            Some(parent) => Some(
                self.linked_children(parent)?
                    .iter()
                    .copied()
                    .filter(|&c| c != node_id)
                    .collect(),
            ),
        }
    }

    /// Preorder walk over the linked subtree rooted at `node_id`.
    pub fn iter_subtree(&self, node_id: NodeId, depth: Option<u32>) -> SubtreeIterator<'_, T> {
        SubtreeIterator::new(self, node_id, depth)
    }
}

/// Preorder traversal that yields `None` if it reaches a node whose
/// children were never linked within the requested depth.
pub struct SubtreeIterator<'a, T> {
    registry: &'a Registry<T>,
    stack: Vec<(NodeId, u32)>,
    depth: Option<u32>,
}

impl<'a, T: NodeInfo> SubtreeIterator<'a, T> {
    fn new(registry: &'a Registry<T>, start: NodeId, depth: Option<u32>) -> Self {
        let stack = if registry.get(start).is_some() {
            vec![(start, 0)]
        } else {
            Vec::new()
        };
        Self {
            registry,
            stack,
            depth,
        }
    }
}

impl<'a, T: NodeInfo> Iterator for SubtreeIterator<'a, T> {
    type Item = Option<(NodeId, &'a Node<T>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (current, distance) = self.stack.pop()?;
        let Some(node) = self.registry.get(current) else {
            return Some(None);
        };
        if self.depth.map_or(true, |d| distance < d) {
            match node.children() {
                Some(children) => {
                    // Push children in reverse order for left-to-right traversal
                    for &child in children.iter().rev() {
                        self.stack.push((child, distance + 1));
                    }
                }
                None => {
                    self.stack.clear();
                    return Some(None);
                }
            }
        }
        Some(Some((current, node)))
    }
}
