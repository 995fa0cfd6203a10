//! New command implementation - creates the next migration script

use anyhow::{Context, Result};
use sl_core::Version;
use sl_migrate::discover_scripts;
use std::fs;

use crate::cli::{GlobalArgs, NewArgs};
use crate::commands::common::load_project;

/// Execute the new command
pub(crate) async fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let migrations = &project.config.migrations;
    let dir = project.config.migrations_dir_absolute(&project.root);

    let slug = slugify(&args.description);
    if slug.is_empty() {
        anyhow::bail!(
            "Invalid description '{}': must contain at least one letter or digit",
            args.description
        );
    }

    let existing = if dir.is_dir() {
        discover_scripts(&dir, &migrations.extension)
            .context("Failed to scan existing migrations")?
    } else {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        Vec::new()
    };

    let number = next_number(existing.iter().map(|script| &script.version));
    let path = dir.join(format!("{number:03}_{slug}.{}", migrations.extension));
    if path.exists() {
        anyhow::bail!("Migration already exists: {}", path.display());
    }

    let header = format!("-- {}\n\n", args.description.trim());
    fs::write(&path, header)
        .with_context(|| format!("Failed to write migration: {}", path.display()))?;

    println!("Created {}", path.display());
    Ok(())
}

/// File-name slug: lower-case ASCII alphanumerics, every other run of
/// characters collapsed to one `_`.
pub(crate) fn slugify(description: &str) -> String {
    let mut slug = String::with_capacity(description.len());
    for c in description.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let trimmed = slug.trim_end_matches('_').len();
    slug.truncate(trimmed);
    slug
}

/// One above the greatest numeric prefix among `versions`.
pub(crate) fn next_number<'a>(versions: impl Iterator<Item = &'a Version>) -> u64 {
    versions
        .map(Version::number)
        .max()
        .map_or(1, |n| n.saturating_add(1))
}

#[cfg(test)]
#[path = "new_test.rs"]
mod tests;
