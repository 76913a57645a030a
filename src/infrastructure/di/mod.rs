//! Dependency wiring for the binary

mod service_container;

pub use service_container::{CategoryManager, ServiceContainer};
