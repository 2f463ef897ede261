use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The `kiln.toml` release manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub release: Release,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub workspace: WorkspaceSettings,
    pub build: Build,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Tests>,
    #[serde(default, rename = "project", skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<Project>,
    #[serde(default, rename = "package", skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<PackageSpec>,
    #[serde(default)]
    pub tools: Tools,
}

/// `[release]`: product identity and version inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub product: String,
    pub base_version: String,
    /// Numeric segment appended to `base_version` to form the assembly version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    /// Where the version stamp source file is written, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_file: Option<String>,
    /// Environment variable carrying a CI-supplied build number.
    #[serde(default = "default_build_number_env")]
    pub build_number_env: String,
}

/// `[paths]`: the three stage roots, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paths {
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_artifacts")]
    pub artifacts: String,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            src: default_src(),
            output: default_output(),
            artifacts: default_artifacts(),
        }
    }
}

/// `[workspace]`: bounded-poll settings used when resetting stage roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_max_checks")]
    pub poll_max_checks: u32,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_checks: default_poll_max_checks(),
        }
    }
}

/// `[build]`: how the external compiler is driven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// Solution or project file, relative to the project root.
    pub solution: String,
    #[serde(default = "default_configuration")]
    pub configuration: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_build_targets")]
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// `[tests]`: the external test runner's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tests {
    /// Test assemblies, relative to the project root.
    pub assemblies: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
    /// Result file name, written under the artifacts root.
    #[serde(default = "default_results_file")]
    pub results_file: String,
}

/// `[[project]]`: one compiled project whose output is staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Directory under `src`; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Compiled output directory inside the project; defaults to `bin/<configuration>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<String>,
    /// Files to stage; defaults to `<name>.{dll,pdb,xml}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default = "default_framework")]
    pub framework: String,
}

/// `[[package]]`: one distributable package built from staged output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub id: String,
    pub authors: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub require_license_acceptance: bool,
    /// Staged files to include, matched inside each framework directory.
    pub files: String,
    #[serde(default = "default_frameworks")]
    pub frameworks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencySpec>,
}

/// A direct package dependency. No `version` means "the version being released".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// `[tools]`: external executables. Bare names are looked up on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tools {
    #[serde(default = "default_compiler")]
    pub compiler: String,
    #[serde(default = "default_test_runner")]
    pub test_runner: String,
    #[serde(default = "default_packager")]
    pub packager: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            test_runner: default_test_runner(),
            packager: default_packager(),
        }
    }
}

fn default_build_number_env() -> String {
    "BUILD_NUMBER".to_owned()
}

fn default_src() -> String {
    "src".to_owned()
}

fn default_output() -> String {
    "build_output".to_owned()
}

fn default_artifacts() -> String {
    "build_artifacts".to_owned()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_poll_max_checks() -> u32 {
    10
}

fn default_configuration() -> String {
    "Release".to_owned()
}

fn default_platform() -> String {
    "Any CPU".to_owned()
}

fn default_build_targets() -> Vec<String> {
    vec!["Clean".to_owned(), "Build".to_owned()]
}

fn default_results_file() -> String {
    "test-results.xml".to_owned()
}

fn default_framework() -> String {
    kiln_targets::DEFAULT_FRAMEWORK_LABEL.to_owned()
}

fn default_frameworks() -> Vec<String> {
    vec![default_framework()]
}

fn default_compiler() -> String {
    "msbuild".to_owned()
}

fn default_test_runner() -> String {
    "nunit-console".to_owned()
}

fn default_packager() -> String {
    "nuget".to_owned()
}

impl Manifest {
    /// Read and parse a `kiln.toml` from the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let manifest: Manifest = toml::from_str(&content).map_err(|e| ManifestError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(manifest)
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        toml::to_string_pretty(self).map_err(|e| ManifestError::Serialize {
            message: e.to_string(),
        })
    }
}

impl Build {
    /// Build settings for `solution` with default configuration, platform and targets.
    pub fn new(solution: &str) -> Self {
        Self {
            solution: solution.to_owned(),
            configuration: default_configuration(),
            platform: default_platform(),
            targets: default_build_targets(),
            properties: BTreeMap::new(),
        }
    }
}

impl Project {
    /// A project at `src/<name>` with default output directory and pattern.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            path: None,
            bin: None,
            pattern: None,
            framework: default_framework(),
        }
    }

    /// Directory of the project under the source root.
    pub fn dir(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }

    /// Compiled output directory inside the project directory.
    pub fn bin_dir(&self, configuration: &str) -> String {
        self.bin
            .clone()
            .unwrap_or_else(|| format!("bin/{configuration}"))
    }

    /// Pattern of files to stage.
    pub fn artifact_pattern(&self) -> String {
        self.pattern
            .clone()
            .unwrap_or_else(|| format!("{}.{{dll,pdb,xml}}", self.name))
    }
}

impl PackageSpec {
    /// Display title; falls back to the package id.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid kiln.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("cannot serialize manifest: {message}")]
    Serialize { message: String },
}
