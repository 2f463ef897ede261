//! External tool invocation (compiler, test runner, packager) and VCS queries.

pub mod command;
pub mod detect;
pub mod error;
pub mod git;
pub mod invoke;

pub use command::{BuildCommand, PackCommand, TestCommand};
pub use detect::locate;
pub use error::ToolError;
pub use git::{GitCli, HeadCommit, VcsReader};
pub use invoke::{run_checked, ExternalTool, ProcessTool};
