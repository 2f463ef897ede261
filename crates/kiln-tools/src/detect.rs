//! Locating external tools before a run.

use std::path::{Path, PathBuf};

/// Find the executable a tool setting refers to.
///
/// A value with more than one path component (or an absolute path) must
/// point at an existing file. A bare command name is searched for on `PATH`,
/// also trying a `.exe` suffix.
pub fn locate(program: &Path) -> Option<PathBuf> {
    if program.is_absolute() || program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = candidate.with_extension("exe");
        exe.is_file().then_some(exe)
    })
}
