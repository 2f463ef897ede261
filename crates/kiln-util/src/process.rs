//! Process execution helpers for Kiln.

use std::process::Command;

use crate::error::UtilError;

/// Structured output from a command execution.
#[derive(Debug)]
pub struct CommandOutput {
    /// Standard output as a string.
    pub stdout: String,
    /// Standard error as a string.
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

/// Execute a command and capture its output.
///
/// # Errors
/// Returns an error if the command cannot be spawned (e.g. binary not found).
/// A non-zero exit code is **not** an error; check `CommandOutput::success` instead.
pub fn run_command(cmd: &mut Command) -> Result<CommandOutput, UtilError> {
    let output = cmd
        .output()
        .map_err(|source| UtilError::CommandExec { source })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        exit_code: output.status.code(),
    })
}

/// Execute a command with inherited stdio and return its exit code.
///
/// A process terminated by a signal reports `-1`.
///
/// # Errors
/// Returns an error if the command cannot be spawned.
pub fn run_streaming(cmd: &mut Command) -> Result<i32, UtilError> {
    let status = cmd
        .status()
        .map_err(|source| UtilError::CommandExec { source })?;
    Ok(status.code().unwrap_or(-1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn run_command_success() {
        let output = run_command(Command::new("echo").arg("hello")).unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.exit_code, Some(0));
    }

    #[test]
    fn run_command_failure() {
        let output = run_command(&mut Command::new("false")).unwrap();
        assert!(!output.success);
        assert_ne!(output.exit_code, Some(0));
    }

    #[test]
    fn run_command_missing_binary() {
        assert!(run_command(&mut Command::new("nonexistent_binary_xyz_123")).is_err());
    }

    #[test]
    fn run_command_captures_stderr() {
        let output = run_command(Command::new("sh").arg("-c").arg("echo err >&2")).unwrap();
        assert!(output.stderr.contains("err"));
    }

    #[test]
    fn run_streaming_reports_exit_code() {
        let code = run_streaming(Command::new("sh").arg("-c").arg("exit 3")).unwrap();
        assert_eq!(code, 3);
    }

    #[test]
    fn run_streaming_missing_binary() {
        assert!(run_streaming(&mut Command::new("nonexistent_binary_xyz_123")).is_err());
    }
}
