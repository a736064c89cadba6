// depres-common/src/lib.rs
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use cache::Cache;
pub use config::{Config, RangePolicy};
pub use error::{DepresError, Result};
pub use model::{Coordinate, Dependency, DependencyVersion, ProjectProperty, Repository};
