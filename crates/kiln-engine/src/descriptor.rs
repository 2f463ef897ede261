//! Package descriptors (`.nuspec` manifests) built from staged artifacts.

use std::path::{Path, PathBuf};

use kiln_config::manifest::PackageSpec;
use kiln_config::PackageConfig;
use kiln_targets::Framework;
use serde::Serialize;

use crate::error::EngineError;
use crate::stage::framework_dir;

/// Path separator used inside descriptors, independent of the host.
pub const MANIFEST_SEPARATOR: char = '\\';

const NUSPEC_XMLNS: &str = "http://schemas.microsoft.com/packaging/2010/07/nuspec.xsd";

/// A direct dependency declared by the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub id: String,
    pub version: String,
}

/// Maps one staged file to its location inside the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    /// Staged file path, written with [`MANIFEST_SEPARATOR`].
    pub source: String,
    /// `lib\<moniker>\<file name>`.
    pub target: String,
}

/// A file in the stage tree together with the framework it was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub framework: Framework,
}

/// Everything the packager needs to produce one package. Built fresh per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub id: String,
    pub version: String,
    pub authors: String,
    pub description: String,
    pub title: String,
    pub project_url: Option<String>,
    pub license_url: Option<String>,
    pub language: Option<String>,
    pub require_license_acceptance: bool,
    pub dependencies: Vec<Dependency>,
    pub files: Vec<FileMapping>,
}

/// Find the staged files a package includes, framework by framework.
///
/// # Errors
/// Returns an error if the package's file pattern is malformed.
pub fn staged_files(
    output_root: &Path,
    package: &PackageConfig,
) -> Result<Vec<StagedFile>, EngineError> {
    let mut staged = Vec::new();
    for framework in &package.frameworks {
        let dir = framework_dir(output_root, framework);
        for path in kiln_util::collect::matching_files(&dir, &package.spec.files)? {
            staged.push(StagedFile {
                path,
                framework: framework.clone(),
            });
        }
    }
    Ok(staged)
}

/// Assemble the descriptor for `spec` at `version` from its staged files.
///
/// Dependencies keep their declared order; one without a version gets
/// `version`. Nothing is resolved transitively.
///
/// # Errors
/// Returns an error if a staged path has no file name.
pub fn build(
    spec: &PackageSpec,
    version: &str,
    staged: &[StagedFile],
) -> Result<PackageDescriptor, EngineError> {
    let dependencies = spec
        .dependencies
        .iter()
        .map(|dep| Dependency {
            id: dep.id.clone(),
            version: dep.version.clone().unwrap_or_else(|| version.to_owned()),
        })
        .collect();

    let files = staged
        .iter()
        .map(|file| map_file(&spec.id, file))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PackageDescriptor {
        id: spec.id.clone(),
        version: version.to_owned(),
        authors: spec.authors.clone(),
        description: spec.description.clone(),
        title: spec.title().to_owned(),
        project_url: spec.project_url.clone(),
        license_url: spec.license_url.clone(),
        language: spec.language.clone(),
        require_license_acceptance: spec.require_license_acceptance,
        dependencies,
        files,
    })
}

fn map_file(id: &str, file: &StagedFile) -> Result<FileMapping, EngineError> {
    let Some(name) = file.path.file_name() else {
        return Err(EngineError::Descriptor {
            id: id.to_owned(),
            message: format!("staged path {} has no file name", file.path.display()),
        });
    };
    let sep = MANIFEST_SEPARATOR;
    Ok(FileMapping {
        source: to_manifest_separators(&file.path.display().to_string()),
        target: format!(
            "lib{sep}{}{sep}{}",
            file.framework.moniker,
            name.to_string_lossy()
        ),
    })
}

fn to_manifest_separators(path: &str) -> String {
    path.chars()
        .map(|c| if c == '/' { MANIFEST_SEPARATOR } else { c })
        .collect()
}

#[derive(Serialize)]
struct NuspecDocument<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    metadata: NuspecMetadata<'a>,
    files: NuspecFiles<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NuspecMetadata<'a> {
    id: &'a str,
    version: &'a str,
    title: &'a str,
    authors: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    require_license_acceptance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<NuspecDependencies<'a>>,
}

#[derive(Serialize)]
struct NuspecDependencies<'a> {
    dependency: Vec<NuspecDependency<'a>>,
}

#[derive(Serialize)]
struct NuspecDependency<'a> {
    #[serde(rename = "@id")]
    id: &'a str,
    #[serde(rename = "@version")]
    version: &'a str,
}

#[derive(Serialize)]
struct NuspecFiles<'a> {
    file: Vec<NuspecFile<'a>>,
}

#[derive(Serialize)]
struct NuspecFile<'a> {
    #[serde(rename = "@src")]
    src: &'a str,
    #[serde(rename = "@target")]
    target: &'a str,
}

impl PackageDescriptor {
    /// Render as a `.nuspec` XML document.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_xml(&self) -> Result<String, EngineError> {
        let dependencies = (!self.dependencies.is_empty()).then(|| NuspecDependencies {
            dependency: self
                .dependencies
                .iter()
                .map(|d| NuspecDependency {
                    id: &d.id,
                    version: &d.version,
                })
                .collect(),
        });

        let document = NuspecDocument {
            xmlns: NUSPEC_XMLNS,
            metadata: NuspecMetadata {
                id: &self.id,
                version: &self.version,
                title: &self.title,
                authors: &self.authors,
                description: &self.description,
                project_url: self.project_url.as_deref(),
                license_url: self.license_url.as_deref(),
                language: self.language.as_deref(),
                require_license_acceptance: self.require_license_acceptance,
                dependencies,
            },
            files: NuspecFiles {
                file: self
                    .files
                    .iter()
                    .map(|f| NuspecFile {
                        src: &f.source,
                        target: &f.target,
                    })
                    .collect(),
            },
        };

        let body = quick_xml::se::to_string_with_root("package", &document).map_err(|e| {
            EngineError::Descriptor {
                id: self.id.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{body}\n"))
    }

    /// Write the XML rendering to `path`.
    ///
    /// # Errors
    /// Returns an error if rendering or writing fails.
    pub fn write_to(&self, path: &Path) -> Result<(), EngineError> {
        let xml = self.to_xml()?;
        std::fs::write(path, xml).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
