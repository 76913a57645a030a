//! SQLite-backed store
//!
//! Layout: one table per node type with `id, lft, rgt, lvl, root_id` plus
//! the entity's payload columns, indexed on `(root_id, lft)`. A companion
//! `<table>_counters` table hands out root ids, so ids of deleted trees are
//! never reused.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::path::Path;
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, instrument, trace, warn};

use crate::domain::{Category, NodeInfo, RangeColumn, RangeFilter};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::traits::{LockScope, RangeWriter, TreeStore, DEFAULT_LOCK_TIMEOUT};

const ROOT_ID_COUNTER: &str = "root_id";

/// Mapping between a node type and its table row.
pub trait SqlNode: NodeInfo {
    /// Payload columns after the range columns, as `(name, sql type)`.
    fn payload_columns() -> &'static [(&'static str, &'static str)];

    /// Payload values in `payload_columns` order.
    fn payload_values(&self) -> Vec<Value>;

    /// Build from a row selected as `id, lft, rgt, lvl, root_id, <payload..>`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl SqlNode for Category {
    fn payload_columns() -> &'static [(&'static str, &'static str)] {
        &[("name", "TEXT NOT NULL")]
    }

    fn payload_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            left: row.get(1)?,
            right: row.get(2)?,
            level: row.get(3)?,
            root_id: row.get(4)?,
            name: row.get(5)?,
        })
    }
}

/// Accept only plain SQL identifiers as table names.
pub fn validate_table_name(table: &str) -> StoreResult<()> {
    let mut chars = table.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}

fn select_columns<T: SqlNode>() -> String {
    let mut columns = vec!["id", "lft", "rgt", "lvl", "root_id"];
    columns.extend(T::payload_columns().iter().map(|(name, _)| *name));
    columns.join(", ")
}

/// Nested-set rows in one SQLite table.
///
/// Writes run in `BEGIN IMMEDIATE` transactions, so the database write lock
/// is held from the first read of a mutation until commit. A lock that
/// cannot be taken within the busy timeout surfaces as contention.
#[derive(Debug)]
pub struct SqliteStore<T> {
    conn: Connection,
    table: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: SqlNode> SqliteStore<T> {
    pub fn open(path: &Path, table: &str, lock_timeout: Duration) -> StoreResult<Self> {
        debug!("open: path={}, table={}", path.display(), table);
        Self::from_connection(Connection::open(path)?, table, lock_timeout)
    }

    pub fn open_in_memory(table: &str) -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, table, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn from_connection(conn: Connection, table: &str, lock_timeout: Duration) -> StoreResult<Self> {
        validate_table_name(table)?;
        conn.busy_timeout(lock_timeout)?;
        Ok(Self {
            conn,
            table: table.to_string(),
            _marker: PhantomData,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the node table, its range index and the counter table if missing.
    #[instrument(level = "debug", skip(self))]
    pub fn init_schema(&self) -> StoreResult<()> {
        let payload: String = T::payload_columns()
            .iter()
            .map(|(name, ty)| format!(",\n                {} {}", name, ty))
            .collect();
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lft INTEGER NOT NULL,
                rgt INTEGER NOT NULL,
                lvl INTEGER NOT NULL,
                root_id INTEGER NOT NULL{payload}
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_root_lft ON {table}(root_id, lft);
            CREATE TABLE IF NOT EXISTS {table}_counters (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            "#,
            table = self.table,
            payload = payload,
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }
}

impl<T: SqlNode> TreeStore<T> for SqliteStore<T> {
    #[instrument(level = "trace", skip(self))]
    fn query_ordered(&self, filter: &RangeFilter) -> StoreResult<Vec<T>> {
        let mut conditions = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(id) = filter.id {
            values.push(Value::Integer(id));
            conditions.push(format!("id = ?{}", values.len()));
        }
        if let Some(root_id) = filter.root_id {
            values.push(Value::Integer(root_id));
            conditions.push(format!("root_id = ?{}", values.len()));
        }
        if let Some(left_min) = filter.left_min {
            values.push(Value::Integer(left_min));
            conditions.push(format!("lft >= ?{}", values.len()));
        }
        if let Some(left_max) = filter.left_max {
            values.push(Value::Integer(left_max));
            conditions.push(format!("lft <= ?{}", values.len()));
        }
        if let Some(max_level) = filter.max_level {
            values.push(Value::Integer(i64::from(max_level)));
            conditions.push(format!("lvl <= ?{}", values.len()));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY root_id, lft",
            select_columns::<T>(),
            self.table,
            where_clause
        );
        trace!(%sql, "query");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| T::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    #[instrument(level = "debug", skip(self, f))]
    fn atomic<R, E, F>(&mut self, scope: LockScope, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn RangeWriter<T>) -> Result<R, E>,
        E: From<StoreError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let result = {
            let mut writer = SqliteWriter {
                tx: &tx,
                table: &self.table,
                scope,
                created_roots: HashSet::new(),
                _marker: PhantomData::<fn() -> T>,
            };
            f(&mut writer)
        };
        match result {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                debug!(%scope, "committed");
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!("rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }
}

struct SqliteWriter<'t, T> {
    tx: &'t Transaction<'t>,
    table: &'t str,
    scope: LockScope,
    created_roots: HashSet<i64>,
    _marker: PhantomData<fn() -> T>,
}

impl<'t, T: SqlNode> SqliteWriter<'t, T> {
    fn check_scope(&self, root_id: i64) -> StoreResult<()> {
        let allowed = match self.scope {
            LockScope::Tree(scoped) => scoped == root_id,
            LockScope::Forest => self.created_roots.contains(&root_id),
        };
        if allowed {
            Ok(())
        } else {
            Err(StoreError::OutOfScope {
                root_id,
                scope: self.scope,
            })
        }
    }
}

impl<'t, T: SqlNode> RangeWriter<T> for SqliteWriter<'t, T> {
    fn find(&mut self, root_id: i64, id: i64) -> StoreResult<Option<T>> {
        self.check_scope(root_id)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE root_id = ?1 AND id = ?2",
            select_columns::<T>(),
            self.table
        );
        let row = self
            .tx
            .query_row(&sql, params![root_id, id], |row| T::from_row(row))
            .optional()?;
        Ok(row)
    }

    fn next_root_id(&mut self) -> StoreResult<i64> {
        let counted: i64 = self
            .tx
            .query_row(
                &format!("SELECT value FROM {}_counters WHERE name = ?1", self.table),
                params![ROOT_ID_COUNTER],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        // tables written before the counter existed
        let stored: i64 = self.tx.query_row(
            &format!("SELECT COALESCE(MAX(root_id), 0) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        let root_id = counted.max(stored) + 1;
        self.tx.execute(
            &format!(
                "INSERT INTO {}_counters (name, value) VALUES (?1, ?2) \
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                self.table
            ),
            params![ROOT_ID_COUNTER, root_id],
        )?;
        self.created_roots.insert(root_id);
        trace!(root_id, "next_root_id");
        Ok(root_id)
    }

    fn shift(&mut self, root_id: i64, column: RangeColumn, min: i64, delta: i64) -> StoreResult<usize> {
        self.check_scope(root_id)?;
        let sql = format!(
            "UPDATE {table} SET {col} = {col} + ?1 WHERE root_id = ?2 AND {col} >= ?3",
            table = self.table,
            col = column.column_name()
        );
        let count = self.tx.execute(&sql, params![delta, root_id, min])?;
        trace!(root_id, ?column, min, delta, count, "shift");
        Ok(count)
    }

    fn detach(&mut self, root_id: i64, left: i64, right: i64) -> StoreResult<usize> {
        self.check_scope(root_id)?;
        let sql = format!(
            "UPDATE {} SET lft = -lft, rgt = -rgt WHERE root_id = ?1 AND lft BETWEEN ?2 AND ?3",
            self.table
        );
        Ok(self.tx.execute(&sql, params![root_id, left, right])?)
    }

    fn reattach(&mut self, root_id: i64, offset: i64, level_delta: i64) -> StoreResult<usize> {
        self.check_scope(root_id)?;
        let sql = format!(
            "UPDATE {} SET lft = ?1 - lft, rgt = ?1 - rgt, lvl = lvl + ?2 WHERE root_id = ?3 AND lft < 0",
            self.table
        );
        Ok(self.tx.execute(&sql, params![offset, level_delta, root_id])?)
    }

    fn insert(&mut self, node: &mut T) -> StoreResult<()> {
        self.check_scope(node.root_id())?;
        let mut columns = vec!["lft", "rgt", "lvl", "root_id"];
        let mut values = vec![
            Value::Integer(node.left()),
            Value::Integer(node.right()),
            Value::Integer(i64::from(node.level())),
            Value::Integer(node.root_id()),
        ];
        columns.extend(T::payload_columns().iter().map(|(name, _)| *name));
        values.extend(node.payload_values());
        if let Some(id) = node.id() {
            columns.push("id");
            values.push(Value::Integer(id));
        }
        let placeholders = (1..=values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders
        );
        self.tx.execute(&sql, params_from_iter(values.iter()))?;
        if node.id().is_none() {
            node.assign_id(self.tx.last_insert_rowid());
        }
        Ok(())
    }

    fn delete_range(&mut self, root_id: i64, left: i64, right: i64) -> StoreResult<usize> {
        self.check_scope(root_id)?;
        let sql = format!(
            "DELETE FROM {} WHERE root_id = ?1 AND lft BETWEEN ?2 AND ?3",
            self.table
        );
        Ok(self.tx.execute(&sql, params![root_id, left, right])?)
    }
}
