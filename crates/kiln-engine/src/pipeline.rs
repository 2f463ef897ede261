//! The standard release pipeline: clean, version, compile, test, package.

use std::path::PathBuf;

use chrono::NaiveDate;
use kiln_config::BuildConfig;
use kiln_tools::{run_checked, BuildCommand, ExternalTool, TestCommand, VcsReader};

use crate::descriptor::{self, PackageDescriptor};
use crate::error::EngineError;
use crate::graph::{Step, TaskGraph};
use crate::version::{self, VersionInfo};
use crate::workspace::Workspace;

/// Prefix of the per-package descriptor tasks, e.g. `nuspec:Automatonymous`.
pub const NUSPEC_TASK_PREFIX: &str = "nuspec:";

/// Target run when none is given.
pub const DEFAULT_TARGET: &str = "default";

/// The external programs a release drives.
pub struct Toolset {
    pub compiler: Box<dyn ExternalTool>,
    pub test_runner: Box<dyn ExternalTool>,
    pub packager: Box<dyn ExternalTool>,
}

/// Mutable state threaded through one pipeline run.
///
/// The configuration is fixed; the version is resolved on first use and then
/// shared by every later task.
pub struct ReleaseContext {
    pub config: BuildConfig,
    pub tools: Toolset,
    pub vcs: Box<dyn VcsReader>,
    pub today: NaiveDate,
    pub ci_override: Option<String>,
    version: Option<VersionInfo>,
    descriptors: Vec<PackageDescriptor>,
    archive: Option<PathBuf>,
}

impl ReleaseContext {
    pub fn new(
        config: BuildConfig,
        tools: Toolset,
        vcs: Box<dyn VcsReader>,
        today: NaiveDate,
        ci_override: Option<String>,
    ) -> Self {
        Self {
            config,
            tools,
            vcs,
            today,
            ci_override,
            version: None,
            descriptors: Vec::new(),
            archive: None,
        }
    }

    /// The version for this run, resolving it on first call.
    pub fn version(&mut self) -> &VersionInfo {
        self.version.get_or_insert_with(|| {
            version::resolve(
                &self.config,
                self.today,
                self.ci_override.as_deref(),
                self.vcs.as_ref(),
            )
        })
    }

    /// Descriptors built so far, in package declaration order.
    pub fn descriptors(&self) -> &[PackageDescriptor] {
        &self.descriptors
    }

    /// Path of the release archive, once the `zip` task has run.
    pub fn archive(&self) -> Option<&PathBuf> {
        self.archive.as_ref()
    }

    fn store_descriptor(&mut self, descriptor: PackageDescriptor) {
        match self.descriptors.iter_mut().find(|d| d.id == descriptor.id) {
            Some(slot) => *slot = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }
}

/// Register the standard release tasks for `config`.
///
/// # Errors
/// Returns `DuplicateTask` if two packages would produce the same task name.
pub fn release_graph(config: &BuildConfig) -> Result<TaskGraph<ReleaseContext>, EngineError> {
    let mut graph = TaskGraph::new();

    graph.register(
        Step::new("clean", "Prepares the working directory for a new build").action(
            |ctx: &mut ReleaseContext| Workspace::from_config(&ctx.config).clean(),
        ),
    )?;

    graph.register(
        Step::new(
            "global_version",
            "Updates the common version information; runs without building",
        )
        .action(global_version),
    )?;

    graph.register(Step::new("build", "Only compiles the application").action(build))?;

    graph.register(
        Step::new(
            "compile",
            "Versions, compiles and stages the application into the output directory",
        )
        .depends_on(&["global_version", "build"])
        .action(|ctx: &mut ReleaseContext| {
            let staged = crate::stage::stage_all(&ctx.config)?;
            tracing::info!(files = staged, "staged compiled output");
            Ok(())
        }),
    )?;

    graph.register(
        Step::new("tests", "Runs unit tests")
            .depends_on(&["compile"])
            .action(tests),
    )?;

    let mut nuspec_tasks = Vec::new();
    for package in &config.packages {
        let id = package.spec.id.clone();
        let task = format!("{NUSPEC_TASK_PREFIX}{id}");
        graph.register(
            Step::new(&task, &format!("Builds the {id} package descriptor"))
                .depends_on(&["compile"])
                .action(move |ctx: &mut ReleaseContext| nuspec(ctx, &id)),
        )?;
        nuspec_tasks.push(task);
    }

    graph.register(
        Step::new("nuget", "Builds the packages")
            .depends_on(nuspec_tasks.as_slice())
            .action(nuget),
    )?;

    graph.register(Step::new("package", "Packages the release").depends_on(&["nuget"]))?;

    graph.register(
        Step::new("zip", "Zips up the build results").action(|ctx: &mut ReleaseContext| {
            let path = crate::archive::create_release_archive(&ctx.config)?;
            ctx.archive = Some(path);
            Ok(())
        }),
    )?;

    graph.register(
        Step::new(DEFAULT_TARGET, "Cleans, compiles, runs tests and packages")
            .depends_on(&["clean", "compile", "tests", "package"]),
    )?;

    graph.register(
        Step::new("all", "Everything the default target does, plus packaging")
            .depends_on(&[DEFAULT_TARGET, "package"]),
    )?;

    Ok(graph)
}

fn global_version(ctx: &mut ReleaseContext) -> Result<(), EngineError> {
    let info = ctx.version().clone();
    tracing::info!(
        build_number = %info.build_number,
        version = %info.informational_version,
        commit = %info.commit_hash,
        "resolved version"
    );

    match &ctx.config.manifest.release.version_file {
        Some(file) => {
            let path = ctx.config.root.join(file);
            version::write_version_file(&path, &info.render_assembly_info(&ctx.config))?;
            tracing::debug!(path = %path.display(), "wrote version file");
        }
        None => tracing::debug!("no version file configured"),
    }
    Ok(())
}

fn build(ctx: &mut ReleaseContext) -> Result<(), EngineError> {
    let settings = &ctx.config.manifest.build;
    let mut command = BuildCommand::new()
        .solution(&ctx.config.root.join(&settings.solution))
        .targets(&settings.targets)
        .property("Configuration", &settings.configuration)
        .property("Platform", &settings.platform);
    for (key, value) in &settings.properties {
        command = command.property(key, value);
    }
    run_checked(ctx.tools.compiler.as_ref(), &command.build_args()?)?;
    Ok(())
}

fn tests(ctx: &mut ReleaseContext) -> Result<(), EngineError> {
    let Some(settings) = &ctx.config.manifest.tests else {
        tracing::info!("no [tests] configured, skipping");
        return Ok(());
    };
    let assemblies: Vec<PathBuf> = settings
        .assemblies
        .iter()
        .map(|a| ctx.config.root.join(a))
        .collect();
    kiln_util::fs::ensure_dir(&ctx.config.artifacts_root)?;
    let args = TestCommand::new()
        .options(&settings.options)
        .results(&ctx.config.artifacts_root.join(&settings.results_file))
        .assemblies(&assemblies)
        .build_args()?;
    run_checked(ctx.tools.test_runner.as_ref(), &args)?;
    Ok(())
}

fn nuspec(ctx: &mut ReleaseContext, id: &str) -> Result<(), EngineError> {
    let version = ctx.version().assembly_version().to_owned();
    let Some(package) = ctx.config.packages.iter().find(|p| p.spec.id == id) else {
        return Err(EngineError::Descriptor {
            id: id.to_owned(),
            message: "package is not configured".to_owned(),
        });
    };

    let staged = descriptor::staged_files(&ctx.config.output_root, package)?;
    if staged.is_empty() {
        tracing::warn!(package = id, pattern = %package.spec.files, "no staged files matched");
    }
    let built = descriptor::build(&package.spec, &version, &staged)?;

    kiln_util::fs::ensure_dir(&ctx.config.artifacts_root)?;
    let path = crate::package::descriptor_path(&ctx.config.artifacts_root, id);
    built.write_to(&path)?;
    tracing::info!(package = id, files = built.files.len(), path = %path.display(), "wrote descriptor");

    ctx.store_descriptor(built);
    Ok(())
}

fn nuget(ctx: &mut ReleaseContext) -> Result<(), EngineError> {
    if ctx.descriptors.is_empty() {
        tracing::warn!("no packages configured, nothing to pack");
    }
    for built in &ctx.descriptors {
        crate::package::pack(
            built,
            &ctx.config.artifacts_root,
            ctx.tools.packager.as_ref(),
        )?;
    }
    Ok(())
}
