//! Status command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use sl_migrate::{
    MigrateResult, MigrationOptions, MigrationRunner, MigrationState, MigrationStatus,
};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{load_project, open_database};

#[derive(Serialize)]
struct StatusReport<'a> {
    project: &'a str,
    ledger_table: &'a str,
    ledger_exists: bool,
    migrations: &'a [MigrationStatus],
}

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let db = open_database(&project, global)?;
    let options = MigrationOptions::from_config(&project.config, &project.root);

    // Read-only: the ledger table is never created here.
    let (ledger_exists, statuses) = tokio::task::spawn_blocking(
        move || -> MigrateResult<(bool, Vec<MigrationStatus>)> {
            let runner = MigrationRunner::new(&db, options)?;
            Ok((runner.ledger().exists(&db)?, runner.status()?))
        },
    )
    .await
    .context("Status task panicked")?
    .context("Failed to read migration status")?;

    match args.output {
        StatusOutput::Json => {
            let report = StatusReport {
                project: &project.config.name,
                ledger_table: project.config.migrations.table.as_str(),
                ledger_exists,
                migrations: &statuses,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StatusOutput::Table => {
            if !ledger_exists {
                println!(
                    "Ledger table {} does not exist yet; run `spendlog migrate` to create it.\n",
                    project.config.migrations.table
                );
            }
            print_table(&statuses);
        }
    }
    Ok(())
}

fn print_table(statuses: &[MigrationStatus]) {
    if statuses.is_empty() {
        println!("No migrations found.");
        return;
    }

    let width = statuses
        .iter()
        .map(|s| s.version.len())
        .max()
        .unwrap_or(0)
        .max("VERSION".len());

    println!("{:<width$}  {:<8}  {:<26}  ERROR", "VERSION", "STATE", "APPLIED AT");
    for status in statuses {
        let applied_at = status
            .applied_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<width$}  {:<8}  {:<26}  {}",
            status.version.as_str(),
            status.state.to_string(),
            applied_at,
            status.error_message.as_deref().unwrap_or(""),
        );
    }

    let count = |state: MigrationState| statuses.iter().filter(|s| s.state == state).count();
    println!(
        "\n{} applied, {} pending, {} failed, {} orphaned",
        count(MigrationState::Applied),
        count(MigrationState::Pending),
        count(MigrationState::Failed),
        count(MigrationState::Orphaned),
    );
}
