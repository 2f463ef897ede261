//! Copy compiled output into the framework-partitioned stage layout.

use std::path::{Path, PathBuf};

use kiln_config::{BuildConfig, ProjectConfig};
use kiln_targets::Framework;

use crate::error::EngineError;

/// Directory holding staged files for one framework: `<output_root>/<label>`.
pub fn framework_dir(output_root: &Path, framework: &Framework) -> PathBuf {
    output_root.join(&framework.label)
}

/// Stage one project's compiled files. Returns the number of files copied.
///
/// # Errors
/// Returns an error if the pattern is malformed or a copy fails. Zero
/// matching files is not an error.
pub fn stage_project(project: &ProjectConfig, output_root: &Path) -> Result<usize, EngineError> {
    let dest = framework_dir(output_root, &project.framework);
    let copied = kiln_util::collect::collect(&project.bin_dir, &project.pattern, &dest)?;
    if copied == 0 {
        tracing::warn!(
            project = %project.name,
            dir = %project.bin_dir.display(),
            pattern = %project.pattern,
            "no compiled files matched"
        );
    }
    Ok(copied)
}

/// Stage every configured project, in declaration order.
///
/// # Errors
/// Fails on the first project that cannot be staged.
pub fn stage_all(config: &BuildConfig) -> Result<usize, EngineError> {
    let mut total = 0usize;
    for project in &config.projects {
        let copied = stage_project(project, &config.output_root)?;
        tracing::info!(project = %project.name, files = copied, "staged");
        total = total.saturating_add(copied);
    }
    Ok(total)
}
