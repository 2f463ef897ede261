//! Stage-root lifecycle: reset to empty before a build.

use std::path::{Path, PathBuf};

use kiln_config::BuildConfig;
use kiln_util::poll::PollPolicy;

use crate::error::EngineError;

/// The two directories a run owns exclusively: output and artifacts.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub output_root: PathBuf,
    pub artifacts_root: PathBuf,
    pub poll: PollPolicy,
}

impl Workspace {
    /// Take the stage roots and poll settings from the build configuration.
    pub fn from_config(config: &BuildConfig) -> Self {
        let (max_checks, interval) = config.poll_settings();
        Self {
            output_root: config.output_root.clone(),
            artifacts_root: config.artifacts_root.clone(),
            poll: PollPolicy::new(max_checks, interval),
        }
    }

    /// Remove `path` and wait until the removal is observable.
    ///
    /// # Errors
    /// Returns `UtilError::ResourceTimeout` (wrapped) if `path` is still
    /// present after the configured number of checks.
    pub fn reset(&self, path: &Path) -> Result<(), EngineError> {
        let checks = kiln_util::fs::reset_dir(path, self.poll)?;
        tracing::debug!(path = %path.display(), checks, "reset");
        Ok(())
    }

    /// Create `path` and its ancestors; a no-op if it already exists.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure(&self, path: &Path) -> Result<(), EngineError> {
        kiln_util::fs::ensure_dir(path)?;
        Ok(())
    }

    /// Reset the output root, then the artifacts root, each polled
    /// independently, and recreate both empty.
    ///
    /// # Errors
    /// Fails on the first root that cannot be removed or recreated.
    pub fn clean(&self) -> Result<(), EngineError> {
        self.reset(&self.output_root)?;
        self.reset(&self.artifacts_root)?;
        self.ensure(&self.output_root)?;
        self.ensure(&self.artifacts_root)?;
        Ok(())
    }
}
