//! The resolved, read-only configuration for one pipeline run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_targets::Framework;

use crate::manifest::{Manifest, ManifestError, PackageSpec, Project};

/// File name of the release manifest at the project root.
pub const MANIFEST_FILE: &str = "kiln.toml";

/// A `[[project]]` entry with its paths resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    /// Absolute directory holding the compiler's output for this project.
    pub bin_dir: PathBuf,
    /// Pattern of files to stage from `bin_dir`.
    pub pattern: String,
    pub framework: Framework,
}

/// A `[[package]]` entry with its frameworks parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConfig {
    pub spec: PackageSpec,
    pub frameworks: Vec<Framework>,
}

/// Configuration resolved once at pipeline start and never mutated.
///
/// Every path is absolute. Components receive a `&BuildConfig` rather than
/// reading ambient state.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub root: PathBuf,
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub artifacts_root: PathBuf,
    pub manifest: Manifest,
    pub projects: Vec<ProjectConfig>,
    pub packages: Vec<PackageConfig>,
}

impl BuildConfig {
    /// Read `kiln.toml` from `root` and resolve it.
    ///
    /// # Errors
    /// Returns an error if the manifest cannot be read or parsed, or fails validation.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let manifest = Manifest::from_path(&root.join(MANIFEST_FILE))?;
        Self::from_manifest(root, manifest)
    }

    /// Resolve an already-parsed manifest against `root`.
    ///
    /// # Errors
    /// Returns an error if the base version is malformed, a project or package
    /// name is duplicated, or a framework label is invalid.
    pub fn from_manifest(root: &Path, manifest: Manifest) -> Result<Self, ConfigError> {
        validate_base_version(&manifest.release.base_version)?;

        let source_root = root.join(&manifest.paths.src);
        let output_root = root.join(&manifest.paths.output);
        let artifacts_root = root.join(&manifest.paths.artifacts);

        let mut seen = HashSet::new();
        let mut projects = Vec::with_capacity(manifest.projects.len());
        for project in &manifest.projects {
            if !seen.insert(project.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "project",
                    name: project.name.clone(),
                });
            }
            projects.push(resolve_project(
                &source_root,
                project,
                &manifest.build.configuration,
            )?);
        }

        let mut seen = HashSet::new();
        let mut packages = Vec::with_capacity(manifest.packages.len());
        for spec in &manifest.packages {
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "package",
                    name: spec.id.clone(),
                });
            }
            let frameworks = spec
                .frameworks
                .iter()
                .map(|label| parse_framework(label, &spec.id))
                .collect::<Result<Vec<_>, _>>()?;
            packages.push(PackageConfig {
                spec: spec.clone(),
                frameworks,
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            source_root,
            output_root,
            artifacts_root,
            manifest,
            projects,
            packages,
        })
    }

    /// The version every build number is derived from.
    pub fn base_version(&self) -> &str {
        &self.manifest.release.base_version
    }

    /// Product name, used for the archive name.
    pub fn product(&self) -> &str {
        &self.manifest.release.product
    }

    /// Resolve a configured tool or input path.
    ///
    /// Values containing a path separator are taken relative to the project
    /// root; bare command names are returned unchanged for `PATH` lookup.
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        if raw.contains('/') || raw.contains('\\') {
            self.root.join(raw)
        } else {
            PathBuf::from(raw)
        }
    }

    /// Bounded-poll policy inputs for workspace resets: `(max_checks, interval)`.
    pub fn poll_settings(&self) -> (u32, Duration) {
        let ws = &self.manifest.workspace;
        (ws.poll_max_checks, Duration::from_millis(ws.poll_interval_ms))
    }
}

fn resolve_project(
    source_root: &Path,
    project: &Project,
    configuration: &str,
) -> Result<ProjectConfig, ConfigError> {
    Ok(ProjectConfig {
        name: project.name.clone(),
        bin_dir: source_root
            .join(project.dir())
            .join(project.bin_dir(configuration)),
        pattern: project.artifact_pattern(),
        framework: parse_framework(&project.framework, &project.name)?,
    })
}

fn parse_framework(label: &str, owner: &str) -> Result<Framework, ConfigError> {
    Framework::parse(label).map_err(|source| ConfigError::Framework {
        owner: owner.to_owned(),
        source,
    })
}

/// A base version is one to four dot-separated numeric segments.
fn validate_base_version(version: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = version.split('.').collect();
    let well_formed = (1..=4).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::InvalidVersion {
            version: version.to_owned(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Manifest(#[from] ManifestError),

    #[error("invalid base_version \"{version}\": expected dot-separated numbers such as 0.4.2")]
    InvalidVersion { version: String },

    #[error("duplicate {kind} `{name}` in kiln.toml")]
    Duplicate { kind: &'static str, name: String },

    #[error("{owner}: {source}")]
    Framework {
        owner: String,
        source: kiln_targets::TargetError,
    },
}
