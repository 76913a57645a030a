//! In-process store with per-tree locking.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, trace};

use crate::domain::{NodeInfo, RangeColumn, RangeFilter};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::traits::{LockScope, RangeWriter, TreeStore, DEFAULT_LOCK_TIMEOUT};

const LOCK_POLL: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct MemoryState<T> {
    /// Rows per tree, ordered by left.
    trees: BTreeMap<i64, Vec<T>>,
    next_id: i64,
    next_root_id: i64,
}

#[derive(Debug)]
struct Shared<T> {
    state: Mutex<MemoryState<T>>,
    tree_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    forest_lock: Arc<Mutex<()>>,
    lock_timeout: Duration,
}

impl<T: NodeInfo> Shared<T> {
    fn state(&self) -> StoreResult<MutexGuard<'_, MemoryState<T>>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn lock_for(&self, scope: LockScope) -> StoreResult<Arc<Mutex<()>>> {
        match scope {
            LockScope::Forest => Ok(Arc::clone(&self.forest_lock)),
            LockScope::Tree(root_id) => {
                let mut locks = self
                    .tree_locks
                    .lock()
                    .map_err(|e| StoreError::Poisoned(e.to_string()))?;
                Ok(Arc::clone(locks.entry(root_id).or_default()))
            }
        }
    }

    fn snapshot(&self, root_id: i64) -> StoreResult<Vec<T>> {
        Ok(self.state()?.trees.get(&root_id).cloned().unwrap_or_default())
    }
}

/// Shared in-memory store; clones are handles onto the same data.
///
/// Writes stage a private copy of each touched tree and publish it on
/// success, so readers always see either the old or the new tree.
#[derive(Debug)]
pub struct MemoryStore<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: NodeInfo> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NodeInfo> MemoryStore<T> {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(MemoryState {
                    trees: BTreeMap::new(),
                    next_id: 1,
                    next_root_id: 1,
                }),
                tree_locks: Mutex::new(HashMap::new()),
                forest_lock: Arc::new(Mutex::new(())),
                lock_timeout,
            }),
        }
    }

    /// Load rows as-is, without any consistency check.
    ///
    /// Rows lacking an id get a fresh one. Id and root counters move past
    /// everything seeded.
    pub fn seed(&self, rows: impl IntoIterator<Item = T>) -> StoreResult<()> {
        let mut state = self.shared.state()?;
        for mut row in rows {
            match row.id() {
                Some(id) => state.next_id = state.next_id.max(id + 1),
                None => {
                    let id = state.next_id;
                    state.next_id += 1;
                    row.assign_id(id);
                }
            }
            state.next_root_id = state.next_root_id.max(row.root_id() + 1);
            state.trees.entry(row.root_id()).or_default().push(row);
        }
        for rows in state.trees.values_mut() {
            rows.sort_by_key(|n| n.left());
        }
        Ok(())
    }
}

fn acquire<'l>(
    lock: &'l Mutex<()>,
    scope: LockScope,
    timeout: Duration,
) -> StoreResult<MutexGuard<'l, ()>> {
    let started = Instant::now();
    loop {
        match lock.try_lock() {
            Ok(guard) => return Ok(guard),
            // The guarded unit holds no data; a panicked holder left nothing half-written.
            Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                if started.elapsed() >= timeout {
                    return Err(StoreError::contention(format!(
                        "{} not acquired within {} ms",
                        scope,
                        timeout.as_millis()
                    )));
                }
                thread::sleep(LOCK_POLL);
            }
        }
    }
}

impl<T: NodeInfo> TreeStore<T> for MemoryStore<T> {
    #[instrument(level = "trace", skip(self))]
    fn query_ordered(&self, filter: &RangeFilter) -> StoreResult<Vec<T>> {
        let state = self.shared.state()?;
        let rows = state
            .trees
            .iter()
            .filter(|(root_id, _)| filter.root_id.map_or(true, |r| r == **root_id))
            .flat_map(|(_, rows)| rows.iter())
            .filter(|n| filter.matches(*n))
            .cloned()
            .collect();
        Ok(rows)
    }

    #[instrument(level = "debug", skip(self, f))]
    fn atomic<R, E, F>(&mut self, scope: LockScope, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn RangeWriter<T>) -> Result<R, E>,
        E: From<StoreError>,
    {
        let lock = self.shared.lock_for(scope)?;
        let _guard = acquire(&lock, scope, self.shared.lock_timeout)?;
        trace!(%scope, "lock acquired");

        let mut tx = MemoryTransaction {
            shared: &self.shared,
            scope,
            staged: BTreeMap::new(),
            created_roots: HashSet::new(),
        };
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }
}

struct MemoryTransaction<'s, T> {
    shared: &'s Shared<T>,
    scope: LockScope,
    staged: BTreeMap<i64, Vec<T>>,
    created_roots: HashSet<i64>,
}

impl<'s, T: NodeInfo> MemoryTransaction<'s, T> {
    fn rows(&mut self, root_id: i64) -> StoreResult<&mut Vec<T>> {
        let allowed = match self.scope {
            LockScope::Tree(scoped) => scoped == root_id,
            LockScope::Forest => self.created_roots.contains(&root_id),
        };
        if !allowed {
            return Err(StoreError::OutOfScope {
                root_id,
                scope: self.scope,
            });
        }
        let rows = match self.staged.entry(root_id) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(self.shared.snapshot(root_id)?),
        };
        Ok(rows)
    }

    fn commit(self) -> StoreResult<()> {
        let mut state = self.shared.state()?;
        for (root_id, mut rows) in self.staged {
            rows.sort_by_key(|n| n.left());
            if rows.is_empty() {
                state.trees.remove(&root_id);
            } else {
                state.trees.insert(root_id, rows);
            }
        }
        debug!(scope = %self.scope, "committed");
        Ok(())
    }
}

impl<'s, T: NodeInfo> RangeWriter<T> for MemoryTransaction<'s, T> {
    fn find(&mut self, root_id: i64, id: i64) -> StoreResult<Option<T>> {
        Ok(self
            .rows(root_id)?
            .iter()
            .find(|n| n.id() == Some(id))
            .cloned())
    }

    fn next_root_id(&mut self) -> StoreResult<i64> {
        let mut state = self.shared.state()?;
        let root_id = state.next_root_id;
        state.next_root_id += 1;
        self.created_roots.insert(root_id);
        Ok(root_id)
    }

    fn shift(&mut self, root_id: i64, column: RangeColumn, min: i64, delta: i64) -> StoreResult<usize> {
        let mut count = 0;
        for node in self.rows(root_id)?.iter_mut() {
            let value = column.get(node);
            if value >= min {
                column.set(node, value + delta);
                count += 1;
            }
        }
        trace!(root_id, ?column, min, delta, count, "shift");
        Ok(count)
    }

    fn detach(&mut self, root_id: i64, left: i64, right: i64) -> StoreResult<usize> {
        let mut count = 0;
        for node in self.rows(root_id)?.iter_mut() {
            if (left..=right).contains(&node.left()) {
                let (l, r) = (node.left(), node.right());
                node.set_left(-l);
                node.set_right(-r);
                count += 1;
            }
        }
        Ok(count)
    }

    fn reattach(&mut self, root_id: i64, offset: i64, level_delta: i64) -> StoreResult<usize> {
        let mut count = 0;
        for node in self.rows(root_id)?.iter_mut() {
            if node.left() < 0 {
                let (l, r) = (node.left(), node.right());
                node.set_left(-l + offset);
                node.set_right(-r + offset);
                let level = i64::from(node.level()) + level_delta;
                let level = u32::try_from(level).map_err(|_| StoreError::LevelOutOfRange { root_id, level })?;
                node.set_level(level);
                count += 1;
            }
        }
        Ok(count)
    }

    fn insert(&mut self, node: &mut T) -> StoreResult<()> {
        if node.id().is_none() {
            let mut state = self.shared.state()?;
            let id = state.next_id;
            state.next_id += 1;
            node.assign_id(id);
        }
        let row = node.clone();
        self.rows(node.root_id())?.push(row);
        Ok(())
    }

    fn delete_range(&mut self, root_id: i64, left: i64, right: i64) -> StoreResult<usize> {
        let rows = self.rows(root_id)?;
        let before = rows.len();
        rows.retain(|n| !(left..=right).contains(&n.left()));
        Ok(before - rows.len())
    }
}
