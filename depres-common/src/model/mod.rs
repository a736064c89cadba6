// depres-common/src/model/mod.rs
// Declares the modules within the model directory.
pub mod dependency;
pub mod repository;
pub mod version;

// Re-export
pub use dependency::{Coordinate, Dependency};
pub use repository::{Repository, RepositoryList};
pub use version::{DependencyVersion, ProjectProperty};
