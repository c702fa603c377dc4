use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use phpantom_core::{Backend, Config, Linter, ProjectIndexer};

#[derive(Parser, Debug)]
#[command(
    name = "phpantom",
    version,
    about = "Index PHP projects and query their symbols and types"
)]
struct Cli {
    /// Extra paths to index before running the command (stubs, vendor)
    #[arg(long = "include", global = true, value_name = "PATH")]
    include: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index files or directories and print the report
    Index {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Also drop records of files that no longer exist
        #[arg(long)]
        prune: bool,
    },
    /// Deduce the types of an expression as if written at a byte offset
    Deduce {
        file: PathBuf,

        #[arg(long)]
        offset: u32,

        expression: String,
    },
    /// Print the flattened view of a classlike
    Resolve { file: PathBuf, fqcn: String },
    /// Report syntax errors and unknown symbols of a file
    Lint { file: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                tracing::error!("could not serialize output: {}", err);
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    match cli.command {
        Command::Index { paths, prune } => {
            let root = paths.first().map(|p| project_root(p)).unwrap_or_default();
            let backend = Backend::in_memory_with(Config::load(&root));

            let mut roots = cli.include;
            roots.extend(paths);
            let report = ProjectIndexer::new(&backend).index(&roots, &HashMap::new());
            let pruned = if prune {
                ProjectIndexer::new(&backend).prune_removed_files()?
            } else {
                Vec::new()
            };

            Ok(json!({
                "report": report,
                "pruned": pruned,
                "files": backend.store().files().len(),
                "classlikes": backend.class_list().len(),
            }))
        }
        Command::Deduce {
            file,
            offset,
            expression,
        } => {
            let (backend, path, content) = load_project(&file, cli.include)?;
            let types = backend.deduce_expression_at(&path, &content, offset, &expression)?;
            Ok(json!({ "expression": expression, "offset": offset, "types": types }))
        }
        Command::Resolve { file, fqcn } => {
            let (backend, _, _) = load_project(&file, cli.include)?;
            let fqcn = phpantom_core::util::to_fqsen(&fqcn);
            Ok(serde_json::to_value(backend.resolve_classlike(&fqcn)?)?)
        }
        Command::Lint { file } => {
            let (backend, path, content) = load_project(&file, cli.include)?;
            let report = Linter::new(&backend).lint(&path, &content);
            Ok(serde_json::to_value(report)?)
        }
    }
}

/// Index the project around `file` plus `include`.  Returns the backend,
/// the canonical path of `file` and its content.
fn load_project(
    file: &Path,
    include: Vec<PathBuf>,
) -> Result<(Backend, String, String), Box<dyn std::error::Error>> {
    let file = std::fs::canonicalize(file)?;
    let content = std::fs::read_to_string(&file)?;
    let root = project_root(&file);
    let backend = Backend::in_memory_with(Config::load(&root));

    let mut roots = include;
    roots.push(root);
    let report = ProjectIndexer::new(&backend).index(&roots, &HashMap::new());
    if !report.failed.is_empty() {
        tracing::warn!("{} file(s) could not be indexed", report.failed.len());
    }

    Ok((backend, file.to_string_lossy().into_owned(), content))
}

/// The nearest ancestor holding a project marker, else the directory of
/// `path` itself.
fn project_root(path: &Path) -> PathBuf {
    let start = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(path)
    };
    start
        .ancestors()
        .find(|dir| {
            dir.join(phpantom_core::config::PROJECT_CONFIG_FILE).exists()
                || dir.join("composer.json").exists()
        })
        .unwrap_or(start)
        .to_path_buf()
}
