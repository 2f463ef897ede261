//! Filesystem utilities for Kiln.

use std::path::{Path, PathBuf};

use crate::error::UtilError;
use crate::poll::{wait_until, PollOutcome, PollPolicy};

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Remove a directory and all its contents. No error if the directory is absent.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Remove `path` recursively and wait until it is observably gone.
///
/// Returns the number of existence checks it took.
///
/// # Errors
/// Returns `UtilError::ResourceTimeout` if `path` still exists after
/// `policy.max_checks` checks.
pub fn reset_dir(path: &Path, policy: PollPolicy) -> Result<u32, UtilError> {
    reset_dir_with(path, policy, remove_dir_all_if_exists)
}

/// Like [`reset_dir`], but with a caller-supplied removal request.
///
/// The removal only has to *request* deletion; completion is detected by
/// polling `path.exists()`. A failed removal is logged, not returned: only the
/// poll decides between success and `ResourceTimeout`.
///
/// # Errors
/// Same as [`reset_dir`].
pub fn reset_dir_with<F>(path: &Path, policy: PollPolicy, remove: F) -> Result<u32, UtilError>
where
    F: FnOnce(&Path) -> Result<(), UtilError>,
{
    if let Err(e) = remove(path) {
        tracing::warn!(path = %path.display(), "removal request failed, polling anyway: {e}");
    }
    match wait_until(policy, || !path.exists()) {
        PollOutcome::Ready { checks } => {
            tracing::debug!(path = %path.display(), checks, "directory removed");
            Ok(checks)
        }
        PollOutcome::TimedOut { checks } => Err(UtilError::ResourceTimeout {
            path: path.display().to_string(),
            checks,
        }),
    }
}

/// Copy the regular file `src` into `dest_dir`, keeping its file name.
///
/// Returns the path of the copy. An existing file of the same name is replaced.
///
/// # Errors
/// Returns an error if `src` has no file name or the copy fails.
pub fn copy_into(src: &Path, dest_dir: &Path) -> Result<PathBuf, UtilError> {
    let Some(name) = src.file_name() else {
        return Err(UtilError::Io {
            path: src.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        });
    };
    let dest = dest_dir.join(name);
    std::fs::copy(src, &dest).map_err(|source| UtilError::Io {
        path: dest.display().to_string(),
        source,
    })?;
    Ok(dest)
}

/// Collect every regular file under `dir`, recursively, sorted by path.
///
/// # Errors
/// Returns an error if `dir` or one of its subdirectories cannot be read.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, UtilError> {
    let mut files = Vec::new();
    walk_files_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_files_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), UtilError> {
    let entries = std::fs::read_dir(dir).map_err(|source| UtilError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| UtilError::Io {
            path: path.display().to_string(),
            source,
        })?;

        // Symlinked directories are not followed; symlinked files are kept.
        if file_type.is_dir() {
            walk_files_recursive(&path, out)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            out.push(path);
        }
    }

    Ok(())
}
