//! Task graph, versioning, staging, packaging and the standard release pipeline.

pub mod archive;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod init;
pub mod package;
pub mod pipeline;
pub mod stage;
pub mod version;
pub mod workspace;

pub use descriptor::PackageDescriptor;
pub use error::EngineError;
pub use graph::{RunReport, Step, Task, TaskGraph};
pub use init::init_project;
pub use pipeline::{release_graph, ReleaseContext, Toolset, DEFAULT_TARGET};
pub use version::{VersionInfo, COMMIT_UNAVAILABLE};
pub use workspace::Workspace;
