//! Storage boundary traits
//!
//! The engines only ever talk to persistence through these two traits, so
//! every backend (and every test double) plugs in the same way.

use std::fmt;
use std::time::Duration;

use crate::domain::{NodeInfo, RangeColumn, RangeFilter};
use crate::infrastructure::error::{StoreError, StoreResult};

/// Default bound on waiting for a write lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Serialization scope a write holds for its whole duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockScope {
    /// All rows of one tree.
    Tree(i64),
    /// Root allocation across the forest.
    Forest,
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(root_id) => write!(f, "tree {}", root_id),
            Self::Forest => f.write_str("forest"),
        }
    }
}

/// Row-level writes available inside one atomic unit.
///
/// Every call is scoped to one tree; a writer rejects trees outside the
/// scope it was opened with.
pub trait RangeWriter<T: NodeInfo> {
    /// Current row for `id` within tree `root_id`, as seen by this unit.
    fn find(&mut self, root_id: i64, id: i64) -> StoreResult<Option<T>>;

    /// Allocate a root id never handed out before, even for deleted trees.
    fn next_root_id(&mut self) -> StoreResult<i64>;

    /// Add `delta` to `column` on every row of the tree where `column >= min`.
    fn shift(&mut self, root_id: i64, column: RangeColumn, min: i64, delta: i64) -> StoreResult<usize>;

    /// Negate both bounds of the rows whose left lies in `[left, right]`,
    /// taking them out of every later shift.
    fn detach(&mut self, root_id: i64, left: i64, right: i64) -> StoreResult<usize>;

    /// Restore detached rows at `-bound + offset` and adjust their level.
    fn reattach(&mut self, root_id: i64, offset: i64, level_delta: i64) -> StoreResult<usize>;

    /// Persist a new row, assigning its id if it has none.
    fn insert(&mut self, node: &mut T) -> StoreResult<()>;

    /// Remove the rows whose left lies in `[left, right]`.
    fn delete_range(&mut self, root_id: i64, left: i64, right: i64) -> StoreResult<usize>;
}

/// Persistence collaborator for one node type.
pub trait TreeStore<T: NodeInfo> {
    /// Rows matching `filter`, ordered by `(root_id, left)`.
    fn query_ordered(&self, filter: &RangeFilter) -> StoreResult<Vec<T>>;

    /// Run `f` as one all-or-nothing unit while holding `scope`.
    ///
    /// If `f` fails, nothing it wrote becomes visible. Failure to obtain the
    /// scope within the configured bound yields [`StoreError::Contention`].
    fn atomic<R, E, F>(&mut self, scope: LockScope, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn RangeWriter<T>) -> Result<R, E>,
        E: From<StoreError>;
}
