#![forbid(unsafe_code)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::{Parser, Subcommand};
use kiln_config::{BuildConfig, MANIFEST_FILE};
use kiln_engine::{release_graph, ReleaseContext, Toolset, DEFAULT_TARGET};
use kiln_tools::{ExternalTool, GitCli, ProcessTool, VcsReader};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "kiln", about = "Release pipeline for .NET solutions")]
#[command(version)]
struct Cli {
    /// Log engine activity at debug level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    /// Project directory containing kiln.toml (defaults to the current directory)
    #[arg(long, short = 'C', global = true)]
    project_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one or more targets and their dependencies
    Run {
        /// Targets to run
        #[arg(default_value = DEFAULT_TARGET)]
        targets: Vec<String>,
        /// CI build number; overrides the date-derived build number
        #[arg(long)]
        build_number: Option<String>,
    },
    /// List every task with its description
    List,
    /// Resolve and print the version without building
    Version {
        /// CI build number; overrides the date-derived build number
        #[arg(long)]
        build_number: Option<String>,
    },
    /// Check kiln.toml and the external tools it needs
    Doctor,
    /// Create a starter kiln.toml
    Init {
        /// Product name (defaults to the directory name)
        #[arg(long)]
        product: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let dir = match cli.project_dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir(),
    };
    let result = match dir {
        Ok(dir) => match cli.command {
            Command::Run {
                targets,
                build_number,
            } => cmd_run(&dir, &targets, build_number),
            Command::List => cmd_list(&dir),
            Command::Version { build_number } => cmd_version(&dir, build_number),
            Command::Doctor => cmd_doctor(&dir),
            Command::Init { product } => cmd_init(&dir, product),
        },
        Err(e) => Err(e.into()),
    };

    if let Err(msg) = result {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

/// Honor `RUST_LOG`; otherwise `warn`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Load the build configuration from `dir`, pointing at `kiln init` when absent.
fn load_config(dir: &Path) -> Result<BuildConfig, Box<dyn Error>> {
    if !dir.join(MANIFEST_FILE).exists() {
        return Err(format!(
            "no {MANIFEST_FILE} found in {} — run `kiln init` to create one",
            dir.display()
        )
        .into());
    }
    let config = BuildConfig::load(dir)?;
    tracing::debug!(
        root = %config.root.display(),
        projects = config.projects.len(),
        packages = config.packages.len(),
        "loaded configuration"
    );
    Ok(config)
}

/// The CI build number: the flag wins, then the configured environment variable.
fn ci_override(flag: Option<String>, env_var: &str) -> Option<String> {
    let usable = |value: &String| !value.trim().is_empty();
    flag.filter(usable)
        .or_else(|| std::env::var(env_var).ok().filter(usable))
}

fn process_tool(config: &BuildConfig, name: &str) -> Box<dyn ExternalTool> {
    Box::new(ProcessTool::new(name, &config.resolve_path(name)).working_dir(&config.root))
}

fn release_context(config: BuildConfig, build_number: Option<String>) -> ReleaseContext {
    let tools = &config.manifest.tools;
    let toolset = Toolset {
        compiler: process_tool(&config, &tools.compiler),
        test_runner: process_tool(&config, &tools.test_runner),
        packager: process_tool(&config, &tools.packager),
    };
    let vcs: Box<dyn VcsReader> = Box::new(GitCli::new(&config.root));
    let ci = ci_override(build_number, &config.manifest.release.build_number_env);
    let today = chrono::Local::now().date_naive();
    ReleaseContext::new(config, toolset, vcs, today, ci)
}

fn cmd_run(dir: &Path, targets: &[String], build_number: Option<String>) -> CliResult {
    let config = load_config(dir)?;
    let graph = release_graph(&config)?;
    let started = Instant::now();
    let mut ctx = release_context(config, build_number);
    let report = graph.run_targets_with(targets, &mut ctx, |task| {
        eprintln!("{}", running_line(task));
    })?;

    eprintln!(
        "    Finished {} in {:.2}s ({} tasks)",
        targets.join(", "),
        started.elapsed().as_secs_f64(),
        report.executed.len()
    );
    Ok(())
}

fn running_line(task: &str) -> String {
    format!("     Running {task}")
}

fn cmd_list(dir: &Path) -> CliResult {
    let config = load_config(dir)?;
    let graph = release_graph(&config)?;
    let width = graph
        .tasks()
        .iter()
        .map(|t| t.name().len())
        .max()
        .unwrap_or(0);
    for task in graph.tasks() {
        let deps = task.dependencies();
        if deps.is_empty() {
            println!("{:width$}  # {}", task.name(), task.description());
        } else {
            println!(
                "{:width$}  # {} (after {})",
                task.name(),
                task.description(),
                deps.join(", ")
            );
        }
    }
    Ok(())
}

fn cmd_version(dir: &Path, build_number: Option<String>) -> CliResult {
    let config = load_config(dir)?;
    let mut ctx = release_context(config, build_number);
    let info = ctx.version();
    println!("version:       {}", info.informational_version);
    println!("build number:  {}", info.build_number);
    println!("commit:        {}", info.commit_hash);
    if let Some(date) = &info.commit_date {
        println!("commit date:   {date}");
    }
    Ok(())
}

fn cmd_doctor(dir: &Path) -> CliResult {
    eprintln!("Checking environment...");
    eprintln!();

    let mut issues = 0u32;

    match load_config(dir) {
        Ok(config) => {
            eprintln!(
                "  [ok] {MANIFEST_FILE}: {} {}",
                config.product(),
                config.base_version()
            );
            let tools = &config.manifest.tools;
            for (role, name) in [
                ("compiler", &tools.compiler),
                ("test runner", &tools.test_runner),
                ("packager", &tools.packager),
            ] {
                match kiln_tools::locate(&config.resolve_path(name)) {
                    Some(path) => eprintln!("  [ok] {role}: {}", path.display()),
                    None => {
                        eprintln!("  [!!] {role}: `{name}` not found");
                        issues = issues.saturating_add(1);
                    }
                }
            }
            match GitCli::new(&config.root).head_commit() {
                Ok(head) => eprintln!("  [ok] git: head {}", head.hash),
                Err(e) => eprintln!("  [--] git: {e} (versions will record no commit)"),
            }
        }
        Err(e) => {
            eprintln!("  [!!] {MANIFEST_FILE}: {e}");
            issues = issues.saturating_add(1);
        }
    }

    eprintln!();
    if issues > 0 {
        return Err(format!("{issues} issue(s) found — fix them before releasing").into());
    }
    eprintln!("All checks passed");
    Ok(())
}

fn cmd_init(dir: &Path, product: Option<String>) -> CliResult {
    let product = product.unwrap_or_else(|| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Product")
            .to_owned()
    });
    kiln_engine::init_project(dir, &product)?;

    eprintln!(
        "    Created {MANIFEST_FILE} for `{product}` in {}",
        dir.display()
    );
    eprintln!();
    eprintln!("  Next steps:");
    eprintln!("    edit {MANIFEST_FILE} to list your projects and packages");
    eprintln!("    kiln run");
    Ok(())
}
