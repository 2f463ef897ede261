//! Error types for kiln-engine.

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed (including workspace poll timeouts).
    #[error("{0}")]
    Util(#[from] kiln_util::error::UtilError),

    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] kiln_config::ConfigError),

    /// An external tool could not be started or exited non-zero.
    #[error("{0}")]
    Tool(#[from] kiln_tools::ToolError),

    /// The requested target is not a registered task.
    #[error("unknown target `{name}` — available targets: {available}")]
    UnknownTarget { name: String, available: String },

    /// Two tasks were registered under the same name.
    #[error("task `{name}` is already registered")]
    DuplicateTask { name: String },

    /// A task depends on a name that was never registered.
    #[error("task `{task}` depends on unknown task `{dependency}`")]
    UnknownDependency { task: String, dependency: String },

    /// The task dependency relation contains a cycle.
    #[error("task dependency cycle: {cycle}")]
    DependencyCycle { cycle: String },

    /// A task's action failed; no later task ran.
    #[error("task `{task}` failed: {source}")]
    TaskFailed {
        task: String,
        source: Box<EngineError>,
    },

    /// A package descriptor could not be produced.
    #[error("cannot build package descriptor for {id}: {message}")]
    Descriptor { id: String, message: String },

    /// The release archive could not be written.
    #[error("cannot write archive {path}: {message}")]
    Archive { path: String, message: String },

    /// A project already has a manifest.
    #[error("kiln.toml already exists at {path} — cannot initialize over an existing project")]
    ProjectExists { path: String },
}

impl EngineError {
    /// Whether this error stems from graph configuration rather than a task's work.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownTarget { .. }
                | EngineError::DuplicateTask { .. }
                | EngineError::UnknownDependency { .. }
                | EngineError::DependencyCycle { .. }
        )
    }

    /// Name of the task that failed, if this is a task failure.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            EngineError::TaskFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}
