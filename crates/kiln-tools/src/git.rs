//! Read-only head-commit queries.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ToolError;

/// Identity of the checked-out head commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadCommit {
    /// Full commit hash.
    pub hash: String,
    /// Commit date as the VCS prints it in ISO form, e.g. `2024-05-02 13:45:10 +0200`.
    pub date_iso: String,
}

/// Source of head-commit metadata.
///
/// Failure is reported, not hidden: callers decide what to fall back to.
pub trait VcsReader {
    /// Read the hash and date of the current head commit.
    ///
    /// # Errors
    /// Returns an error if the VCS is unavailable or the query fails.
    fn head_commit(&self) -> Result<HeadCommit, ToolError>;
}

/// `VcsReader` backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
    program: PathBuf,
}

impl GitCli {
    /// Query the repository containing `repo` with the `git` on `PATH`.
    pub fn new(repo: &Path) -> Self {
        Self {
            repo: repo.to_path_buf(),
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific `git` executable.
    pub fn program(mut self, program: &Path) -> Self {
        self.program = program.to_path_buf();
        self
    }
}

impl VcsReader for GitCli {
    fn head_commit(&self) -> Result<HeadCommit, ToolError> {
        let output = kiln_util::process::run_command(
            Command::new(&self.program)
                .arg("-C")
                .arg(&self.repo)
                .args(["log", "-1", "--date=iso", "--pretty=format:%H%n%ad"]),
        )
        .map_err(|e| ToolError::Vcs {
            message: e.to_string(),
        })?;

        if !output.success {
            return Err(ToolError::Vcs {
                message: output.stderr.trim().to_owned(),
            });
        }
        parse_log_output(&output.stdout)
    }
}

/// Parse the two-line `%H%n%ad` output of `git log`.
fn parse_log_output(stdout: &str) -> Result<HeadCommit, ToolError> {
    let mut lines = stdout.lines().map(str::trim);
    let hash = lines.next().unwrap_or_default();
    let date_iso = lines.next().unwrap_or_default();

    if hash.is_empty() || date_iso.is_empty() {
        return Err(ToolError::Vcs {
            message: format!("unexpected git log output: {stdout:?}"),
        });
    }
    Ok(HeadCommit {
        hash: hash.to_owned(),
        date_iso: date_iso.to_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_output_two_lines() {
        let commit = parse_log_output(
            "3f2a9c0d1e2b3a4c5d6e7f8091a2b3c4d5e6f708\n2024-05-02 13:45:10 +0200",
        )
        .unwrap();
        assert_eq!(commit.hash, "3f2a9c0d1e2b3a4c5d6e7f8091a2b3c4d5e6f708");
        assert_eq!(commit.date_iso, "2024-05-02 13:45:10 +0200");
    }

    #[test]
    fn parse_log_output_empty_is_error() {
        assert!(matches!(parse_log_output(""), Err(ToolError::Vcs { .. })));
    }

    #[test]
    fn parse_log_output_missing_date_is_error() {
        assert!(parse_log_output("abc123\n").is_err());
    }

    #[test]
    fn missing_git_binary_is_vcs_error() {
        let tmp = tempfile::tempdir().unwrap();
        let git = GitCli::new(tmp.path()).program(Path::new("nonexistent_git_xyz_123"));
        assert!(matches!(git.head_commit(), Err(ToolError::Vcs { .. })));
    }

    #[test]
    fn directory_outside_a_repository_is_vcs_error() {
        let tmp = tempfile::tempdir().unwrap();
        // Fails whether or not git is installed: either spawn fails or git
        // reports "not a git repository".
        let git = GitCli::new(&tmp.path().join("missing"));
        assert!(git.head_commit().is_err());
    }
}
