//! Pattern-based file collection with brace alternation.
//!
//! The `glob` crate has no `{a,b}` syntax, so patterns are expanded into one
//! glob per alternative first: `Lib.{dll,pdb}` becomes `Lib.dll` and `Lib.pdb`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Expand every `{a,b,...}` group in `pattern` into separate patterns.
///
/// Groups may be nested and a pattern may contain several groups; the result
/// is their cartesian product, in left-to-right order. A pattern without
/// braces expands to itself.
///
/// # Errors
/// Returns `UtilError::UnbalancedBraces` if a `{` is never closed.
pub fn expand_braces(pattern: &str) -> Result<Vec<String>, UtilError> {
    let Some(open) = pattern.find('{') else {
        return Ok(vec![pattern.to_owned()]);
    };
    let close = matching_brace(pattern, open).ok_or_else(|| UtilError::UnbalancedBraces {
        pattern: pattern.to_owned(),
    })?;

    let prefix = pattern.get(..open).unwrap_or_default();
    let inner = pattern.get(open.saturating_add(1)..close).unwrap_or_default();
    let suffix = pattern.get(close.saturating_add(1)..).unwrap_or_default();

    let mut expanded = Vec::new();
    for alternative in split_top_level(inner) {
        expanded.extend(expand_braces(&format!("{prefix}{alternative}{suffix}"))?);
    }
    Ok(expanded)
}

/// Byte offset of the `}` closing the `{` at `open`.
fn matching_brace(pattern: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in pattern.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '{' => depth = depth.saturating_add(1),
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not inside a nested group.
fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '{' => depth = depth.saturating_add(1),
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(inner.get(start..i).unwrap_or_default());
                start = i.saturating_add(1);
            }
            _ => {}
        }
    }
    parts.push(inner.get(start..).unwrap_or_default());
    parts
}

/// Every entry directly under `dir` (or deeper, if the pattern says so)
/// matching `pattern`, sorted and de-duplicated. Directories are included.
///
/// # Errors
/// Returns an error if the pattern is malformed.
pub fn matching_paths(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, UtilError> {
    let base = PathBuf::from(glob::Pattern::escape(&dir.display().to_string()));
    let mut found = BTreeSet::new();

    for expanded in expand_braces(pattern)? {
        let full_pattern = base.join(&expanded).display().to_string();
        let paths = glob::glob(&full_pattern).map_err(|e| UtilError::GlobPattern {
            pattern: full_pattern.clone(),
            message: e.to_string(),
        })?;
        for entry in paths {
            match entry {
                Ok(path) => {
                    found.insert(path);
                }
                Err(e) => tracing::debug!(pattern = %full_pattern, "skipping unreadable match: {e}"),
            }
        }
    }

    Ok(found.into_iter().collect())
}

/// Regular files under `dir` matching `pattern`, sorted. Directories are skipped.
///
/// # Errors
/// Returns an error if the pattern is malformed.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, UtilError> {
    Ok(matching_paths(dir, pattern)?
        .into_iter()
        .filter(|p| p.is_file())
        .collect())
}

/// Copy the regular files in `source_dir` matching `pattern` into `dest_dir`.
///
/// `dest_dir` is created if absent. Matched directories are skipped silently,
/// and zero matches is not an error. Returns the number of files copied.
///
/// # Errors
/// Returns an error if the pattern is malformed, `dest_dir` cannot be
/// created, or a copy fails.
pub fn collect(source_dir: &Path, pattern: &str, dest_dir: &Path) -> Result<usize, UtilError> {
    crate::fs::ensure_dir(dest_dir)?;

    let mut copied = 0usize;
    for path in matching_paths(source_dir, pattern)? {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "skipping non-file match");
            continue;
        }
        crate::fs::copy_into(&path, dest_dir)?;
        copied = copied.saturating_add(1);
    }

    if copied == 0 {
        tracing::debug!(
            source = %source_dir.display(),
            pattern,
            "pattern matched no files"
        );
    }
    Ok(copied)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn expand_without_braces_is_identity() {
        assert_eq!(expand_braces("Lib.dll").unwrap(), vec!["Lib.dll"]);
    }

    #[test]
    fn expand_extension_alternation() {
        assert_eq!(
            expand_braces("Lib.{dll,pdb,xml}").unwrap(),
            vec!["Lib.dll", "Lib.pdb", "Lib.xml"]
        );
    }

    #[test]
    fn expand_multiple_groups_is_cartesian() {
        assert_eq!(
            expand_braces("{a,b}.{x,y}").unwrap(),
            vec!["a.x", "a.y", "b.x", "b.y"]
        );
    }

    #[test]
    fn expand_nested_group() {
        assert_eq!(
            expand_braces("Lib.{dll,p{db,df}}").unwrap(),
            vec!["Lib.dll", "Lib.pdb", "Lib.pdf"]
        );
    }

    #[test]
    fn expand_unbalanced_is_an_error() {
        let err = expand_braces("Lib.{dll,pdb").unwrap_err();
        assert!(matches!(err, UtilError::UnbalancedBraces { .. }));
    }

    #[test]
    fn collect_copies_only_matching_regular_files() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("bin").join("Release");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("lib.dll"), b"dll").unwrap();
        fs::write(src.join("lib.pdb"), b"pdb").unwrap();
        fs::write(src.join("lib.xml"), b"xml").unwrap();
        fs::write(src.join("lib.config"), b"no").unwrap();
        fs::write(src.join("other.dll"), b"no").unwrap();
        fs::create_dir_all(src.join("obj")).unwrap();

        let dest = tmp.path().join("build_output").join("net-4.0");
        let copied = collect(&src, "lib.{dll,pdb,xml}", &dest).unwrap();

        assert_eq!(copied, 3);
        let mut names: Vec<String> = fs::read_dir(&dest)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["lib.dll", "lib.pdb", "lib.xml"]);
    }

    #[test]
    fn collect_skips_matching_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("lib.xml")).unwrap();
        fs::write(src.join("lib.dll"), b"dll").unwrap();

        let dest = tmp.path().join("dest");
        let copied = collect(&src, "lib.{dll,xml}", &dest).unwrap();

        assert_eq!(copied, 1);
        assert!(dest.join("lib.dll").is_file());
        assert!(!dest.join("lib.xml").exists());
    }

    #[test]
    fn collect_creates_destination_when_nothing_matches() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("empty");
        fs::create_dir_all(&src).unwrap();

        let dest = tmp.path().join("a").join("b");
        let copied = collect(&src, "*.{dll,pdb}", &dest).unwrap();

        assert_eq!(copied, 0);
        assert!(dest.is_dir());
    }

    #[test]
    fn matching_paths_escapes_the_base_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("[weird]");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("lib.dll"), b"").unwrap();

        let files = matching_files(&src, "lib.{dll,pdb}").unwrap();
        assert_eq!(files, vec![src.join("lib.dll")]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            #[allow(clippy::unwrap_used)]
            fn alternation_yields_one_pattern_per_extension(
                stem in "[A-Za-z][A-Za-z0-9]{0,8}",
                exts in proptest::collection::vec("[a-z]{1,4}", 1..6),
            ) {
                let pattern = format!("{stem}.{{{}}}", exts.join(","));
                let expanded = expand_braces(&pattern).unwrap();
                let expected: Vec<String> = exts.iter().map(|e| format!("{stem}.{e}")).collect();
                prop_assert_eq!(expanded, expected);
            }
        }
    }
}
