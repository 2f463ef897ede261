//! Project scaffolding for `kiln init`.

use std::path::Path;

use kiln_config::manifest::{
    Build, Manifest, PackageSpec, Paths, Project, Release, Tools, WorkspaceSettings,
};
use kiln_config::MANIFEST_FILE;

use crate::error::EngineError;

/// Write a starter `kiln.toml` for `product` into `dir`.
///
/// The manifest declares one project and one package named after the
/// product, building `src/<product>.sln`. Creates `dir` if needed.
///
/// # Errors
/// Returns an error if:
/// - A `kiln.toml` already exists in `dir`
/// - The directory or file cannot be created
/// - The manifest cannot be serialized
pub fn init_project(dir: &Path, product: &str) -> Result<(), EngineError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.exists() {
        return Err(EngineError::ProjectExists {
            path: manifest_path.display().to_string(),
        });
    }
    kiln_util::fs::ensure_dir(dir)?;

    let manifest = Manifest {
        release: Release {
            product: product.to_owned(),
            base_version: "0.1.0".to_owned(),
            revision: Some(0),
            description: None,
            copyright: None,
            version_file: Some("src/SolutionVersion.cs".to_owned()),
            build_number_env: "BUILD_NUMBER".to_owned(),
        },
        paths: Paths::default(),
        workspace: WorkspaceSettings::default(),
        build: Build::new(&format!("src/{product}.sln")),
        tests: None,
        projects: vec![Project::new(product)],
        packages: vec![PackageSpec {
            id: product.to_owned(),
            authors: String::new(),
            description: format!("{product} library"),
            title: None,
            project_url: None,
            license_url: None,
            language: None,
            require_license_acceptance: false,
            files: format!("{product}.{{dll,pdb,xml}}"),
            frameworks: vec![kiln_targets::DEFAULT_FRAMEWORK_LABEL.to_owned()],
            dependencies: Vec::new(),
        }],
        tools: Tools::default(),
    };
    let toml_content = manifest.to_toml().map_err(kiln_config::ConfigError::from)?;
    std::fs::write(&manifest_path, toml_content).map_err(|source| EngineError::Io {
        path: manifest_path.display().to_string(),
        source,
    })?;

    // Keep generated directories out of version control.
    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        let body = format!(
            "/{}/\n/{}/\n",
            manifest.paths.output, manifest.paths.artifacts
        );
        std::fs::write(&gitignore_path, body).map_err(|source| EngineError::Io {
            path: gitignore_path.display().to_string(),
            source,
        })?;
    }

    tracing::info!(path = %manifest_path.display(), "initialized project");
    Ok(())
}
