//! Application layer: nested-set use cases
//!
//! The manager owns a registry and a store; the engines under `services`
//! do the actual range queries and renumbering.

pub mod error;
pub mod manager;
pub mod services;

pub use error::{ErrorKind, NestedSetError, NestedSetResult};
pub use manager::NestedSetManager;
