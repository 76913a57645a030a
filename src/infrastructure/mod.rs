//! Infrastructure layer: storage collaborators and DI container
//!
//! Stores implement [`TreeStore`]; the container wires one up for the binary.

pub mod di;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::{SqlNode, SqliteStore};
pub use traits::{LockScope, RangeWriter, TreeStore, DEFAULT_LOCK_TIMEOUT};
