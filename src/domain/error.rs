//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent tree-model violations.
/// These are independent of storage concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node at position {position} has no id")]
    MissingId { position: usize },

    #[error("nodes not ordered by left at position {position}: left {left} follows {previous}")]
    Unsorted {
        position: usize,
        left: i64,
        previous: i64,
    },

    #[error("tree {root_id} appears in more than one run of the input")]
    InterleavedTrees { root_id: i64 },

    #[error("invalid range [{left}, {right}] on node {id}")]
    InvalidRange { id: i64, left: i64, right: i64 },

    #[error("node {id} [{left}, {right}] is not nested inside node {parent} [{parent_left}, {parent_right}]")]
    Overlap {
        id: i64,
        left: i64,
        right: i64,
        parent: i64,
        parent_left: i64,
        parent_right: i64,
    },

    #[error("node {id} has level {level}, expected {expected}")]
    LevelMismatch { id: i64, level: u32, expected: u32 },

    #[error("duplicate node id: {0}")]
    DuplicateId(i64),

    #[error("node {id} spans {width} positions but holds {count} nodes")]
    WidthMismatch { id: i64, width: i64, count: usize },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl DomainError {
    /// Create an invalid-operation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Whether this error reports corrupt or mis-ordered tree data.
    pub fn is_integrity(&self) -> bool {
        !matches!(self, Self::InvalidOperation(_))
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
