//! Release version resolution and the version stamp source file.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use kiln_config::BuildConfig;
use kiln_tools::VcsReader;

use crate::error::EngineError;

/// Commit hash recorded when the VCS cannot be queried.
pub const COMMIT_UNAVAILABLE: &str = "unavailable";

/// Everything downstream stages need to know about the version being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Static base version from `kiln.toml`, e.g. `0.4.2`.
    pub base_version: String,
    /// Optional revision segment appended to form the assembly version.
    pub revision: Option<u32>,
    /// Head commit hash, or [`COMMIT_UNAVAILABLE`].
    pub commit_hash: String,
    /// Head commit date as `YYYY-MM-DD HHMMSS`, when known.
    pub commit_date: Option<String>,
    /// `<base>.<CI build number>` or `<base>.<yy><ddd>`.
    pub build_number: String,
    /// `<base>[.<revision>]`; never affected by a CI override.
    pub informational_version: String,
}

impl VersionInfo {
    /// Version used for assemblies and packages. Same as the informational version.
    pub fn assembly_version(&self) -> &str {
        &self.informational_version
    }

    /// Render the C# assembly-info source the compiler embeds.
    pub fn render_assembly_info(&self, config: &BuildConfig) -> String {
        let release = &config.manifest.release;
        let mut out = String::new();
        out.push_str("// <auto-generated>\n");
        out.push_str("//     Generated by kiln. Changes will be overwritten.\n");
        out.push_str(&format!("//     Commit: {}\n", self.commit_hash));
        if let Some(date) = &self.commit_date {
            out.push_str(&format!("//     Commit date: {date}\n"));
        }
        out.push_str("// </auto-generated>\n\n");

        for namespace in [
            "System",
            "System.Reflection",
            "System.Runtime.InteropServices",
            "System.Security",
        ] {
            out.push_str(&format!("using {namespace};\n"));
        }
        out.push('\n');

        let mut attribute = |name: &str, value: &str| {
            out.push_str(&format!("[assembly: {name}({value})]\n"));
        };
        attribute("AssemblyProduct", &quote(&release.product));
        if let Some(description) = &release.description {
            attribute("AssemblyDescription", &quote(description));
        }
        attribute("AssemblyVersion", &quote(self.assembly_version()));
        attribute("AssemblyFileVersion", &quote(&self.build_number));
        attribute(
            "AssemblyInformationalVersion",
            &quote(&self.informational_version),
        );
        attribute("ComVisibleAttribute", "false");
        attribute("CLSCompliantAttribute", "true");
        if let Some(copyright) = &release.copyright {
            attribute("AssemblyCopyright", &quote(copyright));
        }
        out
    }
}

/// C# string literal with `\` and `"` escaped.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Two-digit year followed by the zero-padded day of year: 2024-05-02 → `24123`.
pub fn pseudo_build_number(date: NaiveDate) -> String {
    date.format("%y%j").to_string()
}

/// Reformat a VCS ISO timestamp as `YYYY-MM-DD HHMMSS`, keeping its own offset.
///
/// Accepts git's `--date=iso` form (`2024-05-02 13:45:10 +0200`), strict
/// RFC 3339, and offset-less `YYYY-MM-DD HH:MM:SS`.
pub fn format_commit_date(iso: &str) -> Option<String> {
    const DISPLAY: &str = "%Y-%m-%d %H%M%S";
    let iso = iso.trim();

    if let Ok(dt) = DateTime::parse_from_str(iso, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.format(DISPLAY).to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return Some(dt.format(DISPLAY).to_string());
    }
    NaiveDateTime::parse_from_str(iso, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.format(DISPLAY).to_string())
}

/// Compute the version for this run.
///
/// A non-blank `ci_override` replaces the date-derived build number. VCS
/// failure never fails resolution: the commit hash becomes
/// [`COMMIT_UNAVAILABLE`] and the date is left unset.
pub fn resolve(
    config: &BuildConfig,
    today: NaiveDate,
    ci_override: Option<&str>,
    vcs: &dyn VcsReader,
) -> VersionInfo {
    let release = &config.manifest.release;
    let base = release.base_version.clone();

    let informational_version = match release.revision {
        Some(revision) => format!("{base}.{revision}"),
        None => base.clone(),
    };

    let build_number = match ci_override.map(str::trim).filter(|s| !s.is_empty()) {
        Some(ci) => format!("{base}.{ci}"),
        None => format!("{base}.{}", pseudo_build_number(today)),
    };

    let (commit_hash, commit_date) = match vcs.head_commit() {
        Ok(head) => {
            let date = format_commit_date(&head.date_iso);
            if date.is_none() {
                tracing::warn!(date = %head.date_iso, "cannot parse commit date, leaving it unset");
            }
            (head.hash, date)
        }
        Err(e) => {
            tracing::warn!("version control unavailable ({e}), using `{COMMIT_UNAVAILABLE}`");
            (COMMIT_UNAVAILABLE.to_owned(), None)
        }
    };

    VersionInfo {
        base_version: base,
        revision: release.revision,
        commit_hash,
        commit_date,
        build_number,
        informational_version,
    }
}

/// Write the assembly-info file, creating parent directories.
///
/// # Errors
/// Returns an error if the file or its parent directory cannot be written.
pub fn write_version_file(path: &Path, contents: &str) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        kiln_util::fs::ensure_dir(parent)?;
    }
    std::fs::write(path, contents).map_err(|source| EngineError::Io {
        path: path.display().to_string(),
        source,
    })
}
