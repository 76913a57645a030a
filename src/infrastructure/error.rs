//! Storage-level errors

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::infrastructure::traits::LockScope;

/// Errors raised by a storage collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("lock contention: {message}")]
    Contention { message: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("tree {root_id} is outside the locked scope {scope}")]
    OutOfScope { root_id: i64, scope: LockScope },

    #[error("level {level} out of range in tree {root_id}")]
    LevelOutOfRange { root_id: i64, level: i64 },

    #[error("invalid table name: {0:?}")]
    InvalidTable(String),

    #[error("store state poisoned: {0}")]
    Poisoned(String),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create a contention error.
    pub fn contention(message: impl Into<String>) -> Self {
        Self::Contention {
            message: message.into(),
        }
    }

    pub fn is_contention(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::contention(e.to_string())
            }
            _ => Self::Sqlite(e),
        }
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
