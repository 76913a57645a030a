//! Application services
//!
//! Read and write engines over a [`TreeStore`](crate::infrastructure::TreeStore).
//! Both borrow the store for the duration of one call; the manager creates
//! them on demand.

mod mutation;
mod query;

pub use mutation::{Deleted, MutationEngine};
pub use query::QueryEngine;
