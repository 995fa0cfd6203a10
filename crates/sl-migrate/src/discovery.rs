//! Migration script discovery.

use crate::error::{MigrateError, MigrateResult};
use sl_core::{compare_versions, Version};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A script found on disk. Content is read only when the script runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub version: Version,
    pub path: PathBuf,
}

impl MigrationScript {
    /// Read the full script text.
    pub fn read(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}

/// Recursively collect files under `dir` whose name ends in `.{extension}`.
fn collect_recursive(
    dir: &Path,
    extension: &str,
    scripts: &mut Vec<MigrationScript>,
) -> MigrateResult<()> {
    let scan_err = |source| MigrateError::Discovery {
        path: dir.display().to_string(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(scan_err)? {
        let path = entry.map_err(scan_err)?.path();
        if path.is_dir() {
            collect_recursive(&path, extension, scripts)?;
            continue;
        }
        if let Some(version) = Version::from_script_path(&path, extension) {
            scripts.push(MigrationScript { version, path });
        }
    }
    Ok(())
}

/// Discover every script under `dir` and return them in run order.
///
/// Order is by [`compare_versions`], independent of directory listing order.
/// Two files yielding the same version (in different subdirectories) are an
/// error, since the ledger could not tell them apart.
pub fn discover_scripts(dir: &Path, extension: &str) -> MigrateResult<Vec<MigrationScript>> {
    let mut scripts = Vec::new();
    collect_recursive(dir, extension, &mut scripts)?;

    let mut seen: HashMap<&Version, &Path> = HashMap::new();
    for script in &scripts {
        if let Some(first) = seen.insert(&script.version, &script.path) {
            return Err(MigrateError::DuplicateVersion {
                version: script.version.to_string(),
                first: first.display().to_string(),
                second: script.path.display().to_string(),
            });
        }
    }

    scripts.sort_by(|a, b| compare_versions(&a.version, &b.version));
    log::debug!(
        "Discovered {} migration script(s) in {}",
        scripts.len(),
        dir.display()
    );
    Ok(scripts)
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
