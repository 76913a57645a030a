//! Range-based reads
//!
//! Fetches trees and subtrees from a store and checks the snapshot before
//! anything is wrapped or linked.

use std::marker::PhantomData;

use tracing::{debug, instrument};

use crate::application::{NestedSetError, NestedSetResult};
use crate::domain::{DomainError, NodeInfo, RangeFilter};
use crate::infrastructure::traits::TreeStore;

/// Read-only access to the rows of a store.
pub struct QueryEngine<'s, T, S> {
    store: &'s S,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T, S> QueryEngine<'s, T, S>
where
    T: NodeInfo,
    S: TreeStore<T>,
{
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Rows matching `filter`, checked for ids, valid ranges and ordering.
    #[instrument(level = "debug", skip(self))]
    pub fn rows(&self, filter: &RangeFilter) -> NestedSetResult<Vec<T>> {
        let rows = self.store.query_ordered(filter)?;
        check_snapshot(&rows)?;
        debug!(count = rows.len(), "rows fetched");
        Ok(rows)
    }

    /// All rows of one tree, or of the whole forest when `root_id` is `None`.
    ///
    /// An empty result is reported as a missing tree.
    pub fn tree_rows(&self, root_id: Option<i64>, max_level: Option<u32>) -> NestedSetResult<Vec<T>> {
        let filter = RangeFilter {
            root_id,
            ..RangeFilter::all()
        }
        .with_max_level(max_level);
        let rows = self.rows(&filter)?;
        if rows.is_empty() {
            return Err(NestedSetError::TreeNotFound { root_id });
        }
        Ok(rows)
    }

    /// Rows strictly inside `node`, at most `depth` levels below it.
    pub fn descendant_rows(&self, node: &T, depth: Option<u32>) -> NestedSetResult<Vec<T>> {
        let max_level = depth.map(|d| node.level() + d);
        self.rows(&RangeFilter::inside(node).with_max_level(max_level))
    }

    /// Rows enclosing `node`, from its root down to its parent.
    pub fn ancestor_rows(&self, node: &T) -> NestedSetResult<Vec<T>> {
        let rows = self.rows(&RangeFilter::before(node))?;
        Ok(rows
            .into_iter()
            .filter(|candidate| candidate.right() > node.right())
            .collect())
    }

    /// The row with entity id `id`.
    pub fn row_by_id(&self, id: i64) -> NestedSetResult<T> {
        self.rows(&RangeFilter::by_id(id))?
            .into_iter()
            .next()
            .ok_or(NestedSetError::NodeNotFound { id, root_id: None })
    }

    /// Every level-0 row of the forest.
    pub fn root_rows(&self) -> NestedSetResult<Vec<T>> {
        self.rows(&RangeFilter::roots())
    }
}

/// Reject rows no consistent store could have produced.
fn check_snapshot<T: NodeInfo>(rows: &[T]) -> NestedSetResult<()> {
    let mut previous: Option<(i64, i64)> = None;
    for (position, row) in rows.iter().enumerate() {
        let id = row.id().ok_or(DomainError::MissingId { position })?;
        if row.left() >= row.right() {
            return Err(DomainError::InvalidRange {
                id,
                left: row.left(),
                right: row.right(),
            }
            .into());
        }
        let key = (row.root_id(), row.left());
        if let Some(prev) = previous {
            if key <= prev {
                return Err(DomainError::Unsorted {
                    position,
                    left: row.left(),
                    previous: prev.1,
                }
                .into());
            }
        }
        previous = Some(key);
    }
    Ok(())
}
