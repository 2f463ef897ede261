//! Error types for kiln-tools.

/// Errors produced by tool invocation and VCS queries.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool could not be started at all.
    #[error("cannot execute {tool}: {source}")]
    Exec {
        tool: String,
        source: std::io::Error,
    },

    /// The tool ran and exited non-zero.
    #[error("{tool} exited with code {code}")]
    Failed { tool: String, code: i32 },

    /// No solution/project file was given to the compiler.
    #[error("no solution specified — set `solution` under [build] in kiln.toml")]
    NoSolution,

    /// No test assemblies were given to the test runner.
    #[error("no test assemblies specified — list them under [tests] in kiln.toml")]
    NoAssemblies,

    /// No package descriptor was given to the packager.
    #[error("no package descriptor specified")]
    NoDescriptor,

    /// The VCS could not report the head commit.
    #[error("cannot read head commit: {message}")]
    Vcs { message: String },

    /// An error propagated from kiln-util.
    #[error("{0}")]
    Util(#[from] kiln_util::error::UtilError),
}
