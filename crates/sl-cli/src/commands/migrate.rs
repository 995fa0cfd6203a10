//! Migrate command implementation

use anyhow::{Context, Result};
use sl_core::Version;
use sl_migrate::{MigrateError, MigrateResult, MigrationOptions, MigrationRunner};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{load_project, open_database, ExitCode};

/// Exit status of a run refused because of an earlier failure.
const BLOCKED_EXIT_CODE: i32 = 2;

enum Outcome {
    Applied(Vec<Version>),
    Planned(Vec<Version>),
}

/// Execute the migrate command
pub(crate) async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let db = open_database(&project, global)?;
    let options = MigrationOptions::from_config(&project.config, &project.root);
    let dry_run = args.dry_run;

    // The runner is synchronous; keep it off the async workers and wait for
    // it before reporting.
    let outcome = tokio::task::spawn_blocking(move || -> MigrateResult<Outcome> {
        let runner = MigrationRunner::new(&db, options)?;
        runner.initialize()?;
        if dry_run {
            let pending = runner.plan()?;
            Ok(Outcome::Planned(
                pending.into_iter().map(|script| script.version).collect(),
            ))
        } else {
            Ok(Outcome::Applied(runner.run_migrations()?.applied))
        }
    })
    .await
    .context("Migration task panicked")?;

    match outcome {
        Ok(Outcome::Planned(versions)) => {
            if versions.is_empty() {
                println!("No pending migrations.");
            } else {
                println!("Dry run - would apply {} migration(s):", versions.len());
                for version in &versions {
                    println!("  {version}");
                }
            }
            Ok(())
        }
        Ok(Outcome::Applied(versions)) => {
            if versions.is_empty() {
                println!("Schema is up to date.");
            } else {
                for version in &versions {
                    println!("  Applied: {version}");
                }
                println!("\nApplied {} migration(s).", versions.len());
            }
            Ok(())
        }
        Err(MigrateError::BlockedByFailure { version, message }) => {
            eprintln!("Migrations are blocked by failed version {version}");
            eprintln!("  Error: {message}");
            eprintln!(
                "\nRepair the database by hand, or fix the script and delete its ledger row:\n  \
                 DELETE FROM {} WHERE version = '{version}';",
                project.config.migrations.table
            );
            Err(ExitCode(BLOCKED_EXIT_CODE).into())
        }
        Err(err) => Err(err).context("Migration failed"),
    }
}
