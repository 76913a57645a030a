//! Application-level errors (wraps domain and storage errors)

use std::fmt;

use thiserror::Error;

use crate::domain::{DomainError, NodeId};
use crate::infrastructure::StoreError;

/// The distinction callers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Stored or supplied data breaks a nested-set invariant.
    Integrity,
    /// The requested tree or node does not exist.
    NotFound,
    /// The requested mutation makes no sense for the given nodes.
    InvalidOperation,
    /// The store could not obtain its lock in time; safe to retry.
    Contention,
    /// Any other backend failure.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Integrity => "integrity violation",
            Self::NotFound => "not found",
            Self::InvalidOperation => "invalid operation",
            Self::Contention => "contention",
            Self::Storage => "storage failure",
        };
        f.write_str(s)
    }
}

/// Errors returned by the nested-set manager and its engines.
#[derive(Error, Debug)]
pub enum NestedSetError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{} not found", tree_label(.root_id))]
    TreeNotFound { root_id: Option<i64> },

    #[error("node {id} not found{}", describe_root(.root_id))]
    NodeNotFound { id: i64, root_id: Option<i64> },

    #[error("node handle {0} is not managed by this registry")]
    UnknownNode(NodeId),
}

impl NestedSetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(e) if e.is_integrity() => ErrorKind::Integrity,
            Self::Domain(_) => ErrorKind::InvalidOperation,
            Self::Store(e) if e.is_contention() => ErrorKind::Contention,
            Self::Store(StoreError::OutOfScope { .. }) => ErrorKind::InvalidOperation,
            Self::Store(StoreError::LevelOutOfRange { .. }) => ErrorKind::Integrity,
            Self::Store(_) => ErrorKind::Storage,
            Self::TreeNotFound { .. } | Self::NodeNotFound { .. } => ErrorKind::NotFound,
            Self::UnknownNode(_) => ErrorKind::InvalidOperation,
        }
    }

    /// Only contention is worth retrying; everything else fails the same way again.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Contention
    }
}

fn tree_label(root_id: &Option<i64>) -> String {
    match root_id {
        Some(r) => format!("tree {}", r),
        None => "any tree".to_string(),
    }
}

fn describe_root(root_id: &Option<i64>) -> String {
    root_id
        .map(|r| format!(" in tree {}", r))
        .unwrap_or_default()
}

/// Result type for application layer operations.
pub type NestedSetResult<T> = Result<T, NestedSetError>;
