//! The capability every tree participant provides.

/// Read/write access to the nested-set columns of a backing entity.
///
/// Any type implementing this trait can be stored and navigated as a tree
/// node. The crate never inspects the payload beyond these accessors.
pub trait NodeInfo: Clone + std::fmt::Debug {
    /// Stable identity, `None` until the store has persisted the entity.
    fn id(&self) -> Option<i64>;

    /// Called by a store when it persists the entity for the first time.
    fn assign_id(&mut self, id: i64);

    fn left(&self) -> i64;
    fn set_left(&mut self, left: i64);

    fn right(&self) -> i64;
    fn set_right(&mut self, right: i64);

    /// Depth below the root; the root itself is level 0.
    fn level(&self) -> u32;
    fn set_level(&mut self, level: u32);

    /// Tree this node belongs to within a forest sharing one table.
    fn root_id(&self) -> i64;
    fn set_root_id(&mut self, root_id: i64);

    /// Number of positions covered by the node's range (`right - left + 1`).
    fn width(&self) -> i64 {
        self.right() - self.left() + 1
    }

    fn is_leaf(&self) -> bool {
        self.right() == self.left() + 1
    }

    fn is_root(&self) -> bool {
        self.level() == 0
    }

    /// Number of nodes strictly below this one.
    fn descendant_count(&self) -> i64 {
        (self.right() - self.left() - 1) / 2
    }

    /// True if `other` lies strictly inside this node's range in the same tree.
    fn contains(&self, other: &impl NodeInfo) -> bool {
        self.root_id() == other.root_id()
            && self.left() < other.left()
            && other.right() < self.right()
    }

    /// The range columns as one comparable tuple.
    fn position(&self) -> (i64, i64, i64, u32) {
        (self.root_id(), self.left(), self.right(), self.level())
    }
}
