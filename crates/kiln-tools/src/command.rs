//! Argument builders for the compiler, test runner, and packager.
//!
//! The builders only produce argument lists; running them is the job of an
//! [`ExternalTool`](crate::invoke::ExternalTool).

use std::path::{Path, PathBuf};

use crate::error::ToolError;

/// Builder for an MSBuild-style compiler invocation.
#[derive(Debug, Default)]
pub struct BuildCommand {
    solution: Option<PathBuf>,
    targets: Vec<String>,
    properties: Vec<(String, String)>,
}

impl BuildCommand {
    /// Create a new empty command builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the solution or project file to build.
    pub fn solution(mut self, path: &Path) -> Self {
        self.solution = Some(path.to_path_buf());
        self
    }

    /// Set the build targets, run in order (e.g. `Clean`, `Build`).
    pub fn targets(mut self, targets: &[String]) -> Self {
        self.targets = targets.to_vec();
        self
    }

    /// Add a `/p:key=value` property. Later properties are passed later.
    pub fn property(mut self, key: &str, value: &str) -> Self {
        self.properties.push((key.to_owned(), value.to_owned()));
        self
    }

    /// Build the argument list without executing.
    ///
    /// # Errors
    /// Returns an error if no solution is set.
    pub fn build_args(&self) -> Result<Vec<String>, ToolError> {
        let Some(solution) = &self.solution else {
            return Err(ToolError::NoSolution);
        };

        let mut args = vec![solution.display().to_string()];
        if !self.targets.is_empty() {
            args.push(format!("/t:{}", self.targets.join(";")));
        }
        for (key, value) in &self.properties {
            args.push(format!("/p:{key}={value}"));
        }
        args.push("/nologo".to_owned());
        Ok(args)
    }
}

/// Builder for an NUnit-console-style test runner invocation.
#[derive(Debug, Default)]
pub struct TestCommand {
    options: Vec<String>,
    results: Option<PathBuf>,
    assemblies: Vec<PathBuf>,
}

impl TestCommand {
    /// Create a new empty command builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass-through runner options, emitted first.
    pub fn options(mut self, options: &[String]) -> Self {
        self.options = options.to_vec();
        self
    }

    /// Write the XML result report to `path`.
    pub fn results(mut self, path: &Path) -> Self {
        self.results = Some(path.to_path_buf());
        self
    }

    /// Set the test assemblies to run.
    pub fn assemblies(mut self, paths: &[PathBuf]) -> Self {
        self.assemblies = paths.to_vec();
        self
    }

    /// Build the argument list without executing.
    ///
    /// # Errors
    /// Returns an error if no assemblies are set.
    pub fn build_args(&self) -> Result<Vec<String>, ToolError> {
        if self.assemblies.is_empty() {
            return Err(ToolError::NoAssemblies);
        }

        let mut args = self.options.clone();
        if let Some(results) = &self.results {
            args.push(format!("/xml={}", results.display()));
        }
        for assembly in &self.assemblies {
            args.push(assembly.display().to_string());
        }
        Ok(args)
    }
}

/// Builder for a NuGet-style `pack` invocation.
#[derive(Debug, Default)]
pub struct PackCommand {
    descriptor: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

impl PackCommand {
    /// Create a new empty command builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The package descriptor file to pack.
    pub fn descriptor(mut self, path: &Path) -> Self {
        self.descriptor = Some(path.to_path_buf());
        self
    }

    /// Directory that receives the package.
    pub fn output_dir(mut self, path: &Path) -> Self {
        self.output_dir = Some(path.to_path_buf());
        self
    }

    /// Build the argument list without executing.
    ///
    /// # Errors
    /// Returns an error if no descriptor is set.
    pub fn build_args(&self) -> Result<Vec<String>, ToolError> {
        let Some(descriptor) = &self.descriptor else {
            return Err(ToolError::NoDescriptor);
        };

        let mut args = vec!["pack".to_owned(), descriptor.display().to_string()];
        if let Some(out) = &self.output_dir {
            args.push("-OutputDirectory".to_owned());
            args.push(out.display().to_string());
        }
        Ok(args)
    }
}
