//! Structural writes: create root, insert, move, delete
//!
//! Every operation re-reads the nodes it depends on inside the store's
//! atomic unit, computes the new ranges there and writes them before the
//! lock is released. Any failure inside the unit discards all of its writes.

use std::marker::PhantomData;

use tracing::{debug, info, instrument};

use crate::application::{NestedSetError, NestedSetResult};
use crate::domain::{placement, DomainError, InsertPosition, NodeInfo, RangeColumn, ROOT_LEFT, ROOT_RIGHT};
use crate::infrastructure::traits::{LockScope, RangeWriter, TreeStore};

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deleted {
    pub root_id: i64,
    /// Rows removed, the subtree root included.
    pub rows: usize,
    /// Positions released by the removal.
    pub width: i64,
}

/// Range renumbering against a store.
pub struct MutationEngine<'s, T, S> {
    store: &'s mut S,
    _marker: PhantomData<fn() -> T>,
}

fn load<T: NodeInfo>(writer: &mut dyn RangeWriter<T>, root_id: i64, id: i64) -> NestedSetResult<T> {
    writer
        .find(root_id, id)?
        .ok_or(NestedSetError::NodeNotFound {
            id,
            root_id: Some(root_id),
        })
}

/// A reference that vanished from its tree makes the request meaningless.
fn load_reference<T: NodeInfo>(writer: &mut dyn RangeWriter<T>, root_id: i64, id: i64) -> NestedSetResult<T> {
    writer.find(root_id, id)?.ok_or_else(|| {
        DomainError::invalid(format!("reference node {} is not present in tree {}", id, root_id)).into()
    })
}

fn require_id<T: NodeInfo>(node: &T) -> NestedSetResult<i64> {
    node.id()
        .ok_or_else(|| DomainError::invalid("node has not been persisted").into())
}

fn same_tree<T: NodeInfo>(node: &T, reference: &T) -> NestedSetResult<()> {
    if node.root_id() != reference.root_id() {
        return Err(DomainError::invalid(format!(
            "node {:?} belongs to tree {} but reference {:?} belongs to tree {}",
            node.id(),
            node.root_id(),
            reference.id(),
            reference.root_id()
        ))
        .into());
    }
    Ok(())
}

impl<'s, T, S> MutationEngine<'s, T, S>
where
    T: NodeInfo,
    S: TreeStore<T>,
{
    pub fn new(store: &'s mut S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Persist `entity` as the root of a new tree with span `[1, 2]`.
    #[instrument(level = "debug", skip(self, entity))]
    pub fn create_root(&mut self, mut entity: T) -> NestedSetResult<T> {
        if entity.id().is_some() {
            return Err(DomainError::invalid("entity is already persisted").into());
        }
        self.store.atomic(LockScope::Forest, move |w| -> NestedSetResult<T> {
            let root_id = w.next_root_id()?;
            entity.set_root_id(root_id);
            entity.set_left(ROOT_LEFT);
            entity.set_right(ROOT_RIGHT);
            entity.set_level(0);
            w.insert(&mut entity)?;
            info!(root_id, id = ?entity.id(), "root created");
            Ok(entity)
        })
    }

    /// Persist `entity` at `position` relative to `reference`.
    ///
    /// Every row at or right of the insertion point moves two positions
    /// right; the new node takes the freed slot `[p, p + 1]`.
    #[instrument(level = "debug", skip(self, entity, reference))]
    pub fn insert(&mut self, mut entity: T, reference: &T, position: InsertPosition) -> NestedSetResult<T> {
        if entity.id().is_some() {
            return Err(DomainError::invalid("entity is already persisted; move it instead").into());
        }
        let reference_id = require_id(reference)?;
        let root_id = reference.root_id();

        self.store.atomic(LockScope::Tree(root_id), move |w| -> NestedSetResult<T> {
            let reference = load_reference(w, root_id, reference_id)?;
            let slot = placement(&reference, position)?;
            w.shift(root_id, RangeColumn::Left, slot.left, 2)?;
            w.shift(root_id, RangeColumn::Right, slot.left, 2)?;

            entity.set_root_id(root_id);
            entity.set_left(slot.left);
            entity.set_right(slot.left + 1);
            entity.set_level(slot.level);
            w.insert(&mut entity)?;
            debug!(root_id, left = slot.left, level = slot.level, "inserted");
            Ok(entity)
        })
    }

    /// Relocate the subtree rooted at `node` to `position` relative to `reference`.
    ///
    /// The subtree is detached (its bounds negated), the gap it leaves is
    /// closed, a gap of the same width is opened at the target and the
    /// subtree is reattached there with its levels adjusted. All four steps
    /// share one atomic unit.
    #[instrument(level = "debug", skip(self, node, reference))]
    pub fn move_subtree(&mut self, node: &T, reference: &T, position: InsertPosition) -> NestedSetResult<T> {
        let node_id = require_id(node)?;
        let reference_id = require_id(reference)?;
        same_tree(node, reference)?;
        let root_id = node.root_id();

        self.store.atomic(LockScope::Tree(root_id), move |w| -> NestedSetResult<T> {
            let node = load(w, root_id, node_id)?;
            let reference = load_reference(w, root_id, reference_id)?;
            if node.is_root() {
                return Err(DomainError::invalid("a root cannot be moved within its own tree").into());
            }
            if node_id == reference_id || node.contains(&reference) {
                return Err(DomainError::invalid(format!(
                    "cannot move node {} relative to itself or its own descendant {}",
                    node_id, reference_id
                ))
                .into());
            }

            let slot = placement(&reference, position)?;
            let (left, right) = (node.left(), node.right());
            let width = node.width();
            let level_delta = i64::from(slot.level) - i64::from(node.level());
            if (slot.left == left || slot.left == right + 1) && level_delta == 0 {
                debug!(node_id, "already in place");
                return Ok(node);
            }

            w.detach(root_id, left, right)?;
            w.shift(root_id, RangeColumn::Left, right + 1, -width)?;
            w.shift(root_id, RangeColumn::Right, right + 1, -width)?;
            let target = if slot.left > right { slot.left - width } else { slot.left };
            w.shift(root_id, RangeColumn::Left, target, width)?;
            w.shift(root_id, RangeColumn::Right, target, width)?;
            let moved = w.reattach(root_id, target - left, level_delta)?;
            debug!(node_id, from = left, to = target, moved, "subtree moved");

            load(w, root_id, node_id)
        })
    }

    /// Remove the subtree rooted at `node` and close the gap it leaves.
    #[instrument(level = "debug", skip(self, node))]
    pub fn delete(&mut self, node: &T) -> NestedSetResult<Deleted> {
        let node_id = require_id(node)?;
        let root_id = node.root_id();

        self.store.atomic(LockScope::Tree(root_id), move |w| -> NestedSetResult<Deleted> {
            let node = load(w, root_id, node_id)?;
            let (left, right) = (node.left(), node.right());
            let width = node.width();
            let rows = w.delete_range(root_id, left, right)?;
            w.shift(root_id, RangeColumn::Left, right + 1, -width)?;
            w.shift(root_id, RangeColumn::Right, right + 1, -width)?;
            debug!(node_id, rows, width, "subtree deleted");
            Ok(Deleted {
                root_id,
                rows,
                width,
            })
        })
    }
}
