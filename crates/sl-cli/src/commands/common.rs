//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use sl_core::Config;
use sl_db::DuckDbBackend;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already reported the problem.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// A loaded project: its root directory and validated configuration.
#[derive(Debug)]
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

/// Load the project named by the global arguments.
///
/// `--config` points at a config file directly; otherwise `spendlog.yml`
/// (or `.yaml`) is looked up in `--project-dir`.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(&root),
    }
    .context("Failed to load project")?;
    log::debug!("Loaded project '{}' from {}", config.name, root.display());
    Ok(Project { root, config })
}

/// Database path for this invocation: `--database` wins over the config.
pub(crate) fn database_path(project: &Project, global: &GlobalArgs) -> String {
    match &global.database {
        Some(path) => path.clone(),
        None => project.config.database_path_absolute(&project.root),
    }
}

/// Open the project's DuckDB database.
pub(crate) fn open_database(project: &Project, global: &GlobalArgs) -> Result<DuckDbBackend> {
    let path = database_path(project, global);
    log::debug!("Opening {} database at {path}", project.config.database.db_type);
    DuckDbBackend::new(&path).with_context(|| format!("Failed to connect to database: {path}"))
}
