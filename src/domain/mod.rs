//! Domain layer: the nested-set model and its pure algorithms
//!
//! This layer is independent of external concerns (no I/O, no storage, no config loading).

pub mod builder;
pub mod entities;
pub mod error;
pub mod invariants;
pub mod node;
pub mod node_info;
pub mod range;
pub mod registry;

pub use builder::{TreeBuilder, TreeLinks};
pub use entities::Category;
pub use error::{DomainError, DomainResult};
pub use invariants::{verify_forest, ForestStats};
pub use node::{Node, NodeId};
pub use node_info::NodeInfo;
pub use range::{placement, InsertPosition, Placement, RangeColumn, RangeFilter, ROOT_LEFT, ROOT_RIGHT};
pub use registry::{Registry, SubtreeIterator};
