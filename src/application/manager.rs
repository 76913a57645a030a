//! Nested-set manager: one registry plus one store handle per unit of work.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use crate::application::services::{Deleted, MutationEngine, QueryEngine};
use crate::application::{NestedSetError, NestedSetResult};
use crate::domain::{
    verify_forest, ForestStats, InsertPosition, Node, NodeId, NodeInfo, Registry, TreeBuilder,
};
use crate::infrastructure::traits::TreeStore;

/// Reads and restructures nested-set trees stored behind `S`.
///
/// Nodes handed out are [`NodeId`] handles into the manager's registry.
/// Navigation answers from memory once a node is linked and falls back to
/// a range query otherwise. Create one manager per unit of work; it is not
/// meant to be shared across threads while mutating.
pub struct NestedSetManager<T, S> {
    store: S,
    registry: Registry<T>,
}

impl<T, S> NestedSetManager<T, S>
where
    T: NodeInfo,
    S: TreeStore<T>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            registry: Registry::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &Registry<T> {
        &self.registry
    }

    /// Drop every managed node. Stored rows are unaffected.
    pub fn clear(&mut self) {
        debug!("clear: dropping {} nodes", self.registry.len());
        self.registry.clear();
    }

    /// Canonical node for `entity`, registering it if needed.
    pub fn get_node(&mut self, entity: T) -> NestedSetResult<NodeId> {
        Ok(self.registry.get_node(entity)?)
    }

    /// All currently managed nodes.
    pub fn get_nodes(&self) -> impl Iterator<Item = (NodeId, &Node<T>)> {
        self.registry.nodes()
    }

    pub fn node(&self, node_id: NodeId) -> NestedSetResult<&Node<T>> {
        self.registry
            .get(node_id)
            .ok_or(NestedSetError::UnknownNode(node_id))
    }

    /// Entity wrapped by `node_id`.
    pub fn info(&self, node_id: NodeId) -> NestedSetResult<&T> {
        self.node(node_id).map(Node::info)
    }

    fn cloned_info(&self, node_id: NodeId) -> NestedSetResult<T> {
        self.info(node_id).cloned()
    }

    fn register_all(&mut self, rows: Vec<T>) -> NestedSetResult<Vec<NodeId>> {
        rows.into_iter()
            .map(|row| self.get_node(row))
            .collect()
    }

    // ============================================================
    // Queries
    // ============================================================

    /// Fetch a whole tree and link it; returns its root.
    ///
    /// Without `root_id` every tree of the forest is fetched and linked and
    /// the root with the lowest root id is returned.
    #[instrument(level = "debug", skip(self))]
    pub fn fetch_tree(&mut self, root_id: Option<i64>) -> NestedSetResult<NodeId> {
        let rows = QueryEngine::new(&self.store).tree_rows(root_id, None)?;
        let node_ids = self.register_all(rows)?;
        self.build_tree(&node_ids, None)?;
        let root = node_ids
            .iter()
            .copied()
            .find(|&id| self.registry.info(id).is_some_and(|info| info.is_root()))
            .ok_or(NestedSetError::TreeNotFound { root_id })?;
        Ok(root)
    }

    /// Fetch a tree as a flat list in left order, without linking it.
    #[instrument(level = "debug", skip(self))]
    pub fn fetch_tree_as_list(
        &mut self,
        root_id: Option<i64>,
        max_level: Option<u32>,
    ) -> NestedSetResult<Vec<NodeId>> {
        let rows = QueryEngine::new(&self.store).tree_rows(root_id, max_level)?;
        self.register_all(rows)
    }

    /// Node for the stored entity with id `id`, read fresh from the store.
    pub fn load(&mut self, id: i64) -> NestedSetResult<NodeId> {
        let row = QueryEngine::new(&self.store).row_by_id(id)?;
        self.get_node(row)
    }

    /// Roots of every tree in the forest, ordered by root id.
    pub fn fetch_roots(&mut self) -> NestedSetResult<Vec<NodeId>> {
        let rows = QueryEngine::new(&self.store).root_rows()?;
        self.register_all(rows)
    }

    /// Link the nodes of a left-ordered list so navigation needs no query.
    ///
    /// The list is validated first; on any violation no node is changed.
    #[instrument(level = "debug", skip(self, node_ids), fields(len = node_ids.len()))]
    pub fn build_tree(&mut self, node_ids: &[NodeId], max_level: Option<u32>) -> NestedSetResult<()> {
        let infos = node_ids
            .iter()
            .map(|&id| self.info(id))
            .collect::<NestedSetResult<Vec<&T>>>()?;
        let links = TreeBuilder::with_max_level(max_level).link(&infos)?;
        self.registry.apply_links(node_ids, &links);
        Ok(())
    }

    /// Check every invariant of one tree (or the forest) against a fresh read.
    pub fn verify(&self, root_id: Option<i64>) -> NestedSetResult<ForestStats> {
        let rows = QueryEngine::new(&self.store).tree_rows(root_id, None)?;
        let refs: Vec<&T> = rows.iter().collect();
        Ok(verify_forest(&refs)?)
    }

    // ============================================================
    // Navigation
    // ============================================================

    /// Parent of the node, `None` for a root.
    pub fn parent(&mut self, node_id: NodeId) -> NestedSetResult<Option<NodeId>> {
        if let Some(parent) = self.registry.linked_parent(node_id) {
            return Ok(parent);
        }
        Ok(self.load_ancestors(node_id)?.last().copied())
    }

    /// Ancestors from the root down to the parent.
    pub fn ancestors(&mut self, node_id: NodeId) -> NestedSetResult<Vec<NodeId>> {
        if let Some(ancestors) = self.registry.linked_ancestors(node_id) {
            return Ok(ancestors);
        }
        self.load_ancestors(node_id)
    }

    /// Direct children in left order.
    pub fn children(&mut self, node_id: NodeId) -> NestedSetResult<Vec<NodeId>> {
        if let Some(children) = self.registry.linked_children(node_id) {
            return Ok(children.to_vec());
        }
        self.load_descendants(node_id, Some(1))?;
        Ok(self
            .registry
            .linked_children(node_id)
            .map(<[NodeId]>::to_vec)
            .unwrap_or_default())
    }

    /// Descendants in left order, at most `depth` levels below the node.
    pub fn descendants(&mut self, node_id: NodeId, depth: Option<u32>) -> NestedSetResult<Vec<NodeId>> {
        if let Some(descendants) = self.registry.linked_descendants(node_id, depth) {
            return Ok(descendants);
        }
        self.load_descendants(node_id, depth)
    }

    /// Other children of the node's parent in left order; empty for roots.
    pub fn siblings(&mut self, node_id: NodeId) -> NestedSetResult<Vec<NodeId>> {
        if let Some(siblings) = self.registry.linked_siblings(node_id) {
            return Ok(siblings);
        }
        match self.parent(node_id)? {
            None => Ok(Vec::new()),
            Some(parent) => Ok(self
                .children(parent)?
                .into_iter()
                .filter(|&c| c != node_id)
                .collect()),
        }
    }

    /// Query the ancestor chain and link it parent-to-child.
    fn load_ancestors(&mut self, node_id: NodeId) -> NestedSetResult<Vec<NodeId>> {
        let info = self.cloned_info(node_id)?;
        debug!("load_ancestors: id={:?}", info.id());
        let rows = QueryEngine::new(&self.store).ancestor_rows(&info)?;
        let chain = self.register_all(rows)?;
        let mut parent = None;
        for &ancestor in chain.iter().chain(std::iter::once(&node_id)) {
            if parent.is_some() || self.registry.info(ancestor).is_some_and(|i| i.is_root()) {
                self.registry.set_parent(ancestor, parent);
            }
            parent = Some(ancestor);
        }
        Ok(chain)
    }

    /// Query the subtree below `node_id` (down to `depth` levels) and link it.
    fn load_descendants(&mut self, node_id: NodeId, depth: Option<u32>) -> NestedSetResult<Vec<NodeId>> {
        let info = self.cloned_info(node_id)?;
        debug!("load_descendants: id={:?}, depth={:?}", info.id(), depth);
        let rows = QueryEngine::new(&self.store).descendant_rows(&info, depth)?;
        let descendants = self.register_all(rows)?;

        let mut list = Vec::with_capacity(descendants.len() + 1);
        list.push(node_id);
        list.extend(descendants.iter().copied());
        let max_level = depth.map(|d| info.level() + d);
        self.build_tree(&list, max_level)?;
        Ok(descendants)
    }

    // ============================================================
    // Mutations
    // ============================================================

    /// Persist `entity` as the root of a new tree.
    pub fn create_root(&mut self, entity: T) -> NestedSetResult<NodeId> {
        let root = MutationEngine::new(&mut self.store).create_root(entity)?;
        let node_id = self.get_node(root)?;
        self.registry.set_children(node_id, Vec::new());
        Ok(node_id)
    }

    /// Persist `entity` at `position` relative to `reference`.
    #[instrument(level = "debug", skip(self, entity))]
    pub fn insert(
        &mut self,
        entity: T,
        reference: NodeId,
        position: InsertPosition,
    ) -> NestedSetResult<NodeId> {
        let reference_info = self.cloned_info(reference)?;
        let inserted = MutationEngine::new(&mut self.store).insert(entity, &reference_info, position)?;
        let root_id = inserted.root_id();
        let node_id = self.get_node(inserted)?;
        self.refresh_tree(root_id)?;
        Ok(node_id)
    }

    /// Move the subtree rooted at `node` to `position` relative to `reference`.
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(
        &mut self,
        node: NodeId,
        reference: NodeId,
        position: InsertPosition,
    ) -> NestedSetResult<()> {
        let node_info = self.cloned_info(node)?;
        let reference_info = self.cloned_info(reference)?;
        let moved = MutationEngine::new(&mut self.store).move_subtree(&node_info, &reference_info, position)?;
        self.refresh_tree(moved.root_id())
    }

    /// Delete the subtree rooted at `node`.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, node: NodeId) -> NestedSetResult<Deleted> {
        let node_info = self.cloned_info(node)?;
        let deleted = MutationEngine::new(&mut self.store).delete(&node_info)?;
        self.refresh_tree(deleted.root_id)?;
        Ok(deleted)
    }

    /// Re-read one tree after a write: cached nodes get their new ranges
    /// and lose their links, nodes whose rows are gone leave the registry.
    fn refresh_tree(&mut self, root_id: i64) -> NestedSetResult<()> {
        let cached: Vec<NodeId> = self
            .registry
            .nodes()
            .filter(|(_, node)| node.info().root_id() == root_id)
            .map(|(id, _)| id)
            .collect();
        if cached.is_empty() {
            return Ok(());
        }

        let rows = match QueryEngine::new(&self.store).tree_rows(Some(root_id), None) {
            Ok(rows) => rows,
            Err(NestedSetError::TreeNotFound { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        let mut alive = HashSet::with_capacity(rows.len());
        for row in rows {
            let Some(id) = row.id() else { continue };
            if let Some(node_id) = self.registry.lookup(id) {
                alive.insert(node_id);
                self.registry.get_node(row)?;
                self.registry.unlink(node_id);
            }
        }
        for node_id in cached {
            if !alive.contains(&node_id) {
                if let Some(gone) = self.registry.remove(node_id) {
                    warn!("refresh_tree: dropping deleted node {:?}", gone.id());
                }
            }
        }
        Ok(())
    }
}
