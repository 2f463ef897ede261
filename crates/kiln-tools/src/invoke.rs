//! The `ExternalTool` capability and its process-backed implementation.

use std::path::{Path, PathBuf};
use std::process::Command;

use kiln_util::error::UtilError;

use crate::error::ToolError;

/// A blocking external program the pipeline drives by exit code alone.
///
/// Output is streamed or captured but never parsed; `0` means success. Test
/// suites substitute in-memory implementations.
pub trait ExternalTool {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Run the tool to completion and return its exit code.
    ///
    /// # Errors
    /// Returns an error only if the tool cannot be started.
    fn invoke(&self, args: &[String]) -> Result<i32, ToolError>;
}

/// Invoke `tool` and turn a non-zero exit code into `ToolError::Failed`.
///
/// No retry is attempted.
///
/// # Errors
/// Returns an error if the tool cannot be started or exits non-zero.
pub fn run_checked(tool: &dyn ExternalTool, args: &[String]) -> Result<(), ToolError> {
    tracing::debug!(tool = tool.name(), ?args, "invoking external tool");
    let code = tool.invoke(args)?;
    if code == 0 {
        Ok(())
    } else {
        Err(ToolError::Failed {
            tool: tool.name().to_owned(),
            code,
        })
    }
}

/// An `ExternalTool` backed by a real subprocess with inherited stdio.
#[derive(Debug, Clone)]
pub struct ProcessTool {
    name: String,
    program: PathBuf,
    working_dir: Option<PathBuf>,
}

impl ProcessTool {
    /// Create a tool that runs `program`. `name` is used in logs and errors.
    pub fn new(name: &str, program: &Path) -> Self {
        Self {
            name: name.to_owned(),
            program: program.to_path_buf(),
            working_dir: None,
        }
    }

    /// Run the tool from `dir` instead of the current directory.
    pub fn working_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }
}

impl ExternalTool for ProcessTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, args: &[String]) -> Result<i32, ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        kiln_util::process::run_streaming(&mut cmd).map_err(|e| match e {
            UtilError::CommandExec { source } => ToolError::Exec {
                tool: self.name.clone(),
                source,
            },
            other => ToolError::Util(other),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct Recorder {
        code: i32,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ExternalTool for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn invoke(&self, args: &[String]) -> Result<i32, ToolError> {
            self.calls.borrow_mut().push(args.to_vec());
            Ok(self.code)
        }
    }

    #[test]
    fn run_checked_passes_args_through() {
        let tool = Recorder {
            code: 0,
            calls: RefCell::new(Vec::new()),
        };
        run_checked(&tool, &["a".to_owned(), "b c".to_owned()]).unwrap();
        assert_eq!(*tool.calls.borrow(), vec![vec!["a", "b c"]]);
    }

    #[test]
    fn run_checked_fails_on_nonzero_exit() {
        let tool = Recorder {
            code: 2,
            calls: RefCell::new(Vec::new()),
        };
        match run_checked(&tool, &[]).unwrap_err() {
            ToolError::Failed { tool, code } => {
                assert_eq!(tool, "recorder");
                assert_eq!(code, 2);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(tool.calls.borrow().len(), 1, "no retry expected");
    }

    #[test]
    fn process_tool_reports_exit_code() {
        let tool = ProcessTool::new("sh", Path::new("sh"));
        let code = tool
            .invoke(&["-c".to_owned(), "exit 7".to_owned()])
            .unwrap();
        assert_eq!(code, 7);
    }

    #[test]
    fn process_tool_runs_in_working_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = ProcessTool::new("sh", Path::new("sh")).working_dir(tmp.path());
        tool.invoke(&["-c".to_owned(), "touch marker".to_owned()])
            .unwrap();
        assert!(tmp.path().join("marker").exists());
    }

    #[test]
    fn process_tool_missing_binary_is_exec_error() {
        let tool = ProcessTool::new("ghost", Path::new("nonexistent_binary_xyz_123"));
        let err = tool.invoke(&[]).unwrap_err();
        assert!(matches!(err, ToolError::Exec { ref tool, .. } if tool == "ghost"));
        assert!(err.to_string().starts_with("cannot execute ghost"));
    }
}
