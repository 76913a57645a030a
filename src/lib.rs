//! Nested-set trees (modified preorder tree traversal) over a flat table.
//!
//! Each stored row carries `left`, `right`, `level` and `root_id`; the
//! [`application::NestedSetManager`] turns such rows into navigable nodes
//! and keeps the ranges consistent across inserts, moves and deletes.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::{ErrorKind, NestedSetError, NestedSetManager, NestedSetResult};
pub use domain::{Category, InsertPosition, NodeId, NodeInfo};
pub use infrastructure::{MemoryStore, SqliteStore, TreeStore};
