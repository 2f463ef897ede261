//! Error types for kiln-util.

/// Errors produced by utility functions.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// An I/O operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A glob pattern was invalid.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    GlobPattern { pattern: String, message: String },

    /// A brace alternation in a pattern was never closed.
    #[error("unbalanced braces in pattern `{pattern}`")]
    UnbalancedBraces { pattern: String },

    /// A command failed to execute.
    #[error("cannot execute command: {source}")]
    CommandExec { source: std::io::Error },

    /// A directory was still present after the bounded poll ran out of checks.
    #[error("timed out after {checks} check(s) waiting for {path} to be removed — make sure nothing is running from that directory and no file browser or shell has it open")]
    ResourceTimeout { path: String, checks: u32 },
}
