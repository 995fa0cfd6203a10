//! The migration runner.
//!
//! Per version the ledger moves `UNSEEN -> ATTEMPTING -> APPLIED | FAILED`.
//! The runner never leaves `FAILED` by itself: while any version is failed,
//! [`MigrationRunner::run_migrations`] refuses to start.

use crate::discovery::{discover_scripts, MigrationScript};
use crate::error::{MigrateError, MigrateResult};
use crate::ledger::{Ledger, MigrationRecord};
use crate::status::{build_report, MigrationStatus};
use sl_core::{Config, TableName, Version};
use sl_db::{Database, Transaction};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where scripts come from and where outcomes go.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Directory scanned recursively for scripts
    pub dir: PathBuf,
    /// Script extension without the dot
    pub extension: String,
    /// Ledger table name
    pub table: TableName,
}

impl MigrationOptions {
    /// Options for `dir` with the default `.sql` extension and
    /// `schema_migrations` ledger.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "sql".to_string(),
            table: TableName::new("schema_migrations"),
        }
    }

    /// Options from project configuration, resolving the directory against
    /// the project `root`.
    pub fn from_config(config: &Config, root: &Path) -> Self {
        Self {
            dir: config.migrations_dir_absolute(root),
            extension: config.migrations.extension.clone(),
            table: config.migrations.table.clone(),
        }
    }
}

/// Outcome of a successful [`MigrationRunner::run_migrations`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationRunReport {
    /// Versions applied by this call, in the order they ran
    pub applied: Vec<Version>,
}

impl MigrationRunReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Applies pending scripts from a directory against a [`Database`].
///
/// Strictly sequential and blocking. Callers on an async runtime should run
/// it on a blocking worker and wait for it before serving traffic.
pub struct MigrationRunner<'a> {
    db: &'a dyn Database,
    ledger: Ledger,
    dir: PathBuf,
    extension: String,
}

impl<'a> MigrationRunner<'a> {
    /// Fails with [`MigrateError::InvalidLedgerTable`] when the ledger table
    /// name in `options` is not a plain identifier.
    pub fn new(db: &'a dyn Database, options: MigrationOptions) -> MigrateResult<Self> {
        Ok(Self {
            db,
            ledger: Ledger::new(options.table)?,
            dir: options.dir,
            extension: options.extension,
        })
    }

    /// The ledger this runner writes to.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Create the ledger table and indexes. Safe to call on every start.
    pub fn initialize(&self) -> MigrateResult<()> {
        self.ledger.initialize(self.db)
    }

    /// Fail with [`MigrateError::BlockedByFailure`] if any version is
    /// recorded as failed.
    pub fn check_last_failed_migration(&self) -> MigrateResult<()> {
        match self.ledger.last_failed(self.db)? {
            Some(MigrationRecord {
                version,
                error_message,
                ..
            }) => {
                log::error!(
                    "Migration {version} previously failed and blocks further migrations: {error_message}"
                );
                Err(MigrateError::BlockedByFailure {
                    version: version.into_inner(),
                    message: error_message,
                })
            }
            None => Ok(()),
        }
    }

    /// Versions whose latest attempt succeeded.
    pub fn get_applied_migrations(&self) -> MigrateResult<HashSet<Version>> {
        self.ledger.applied_versions(self.db)
    }

    /// Scripts currently on disk, in run order.
    pub fn get_available_migrations(&self) -> MigrateResult<Vec<MigrationScript>> {
        discover_scripts(&self.dir, &self.extension)
    }

    /// Scripts that [`run_migrations`](Self::run_migrations) would apply,
    /// without applying anything. Fails when blocked, like a real run.
    pub fn plan(&self) -> MigrateResult<Vec<MigrationScript>> {
        self.check_last_failed_migration()?;
        let applied = self.get_applied_migrations()?;
        let pending = self
            .get_available_migrations()?
            .into_iter()
            .filter(|script| !applied.contains(&script.version))
            .collect();
        Ok(pending)
    }

    /// Bring the schema up to date, stopping at the first failure.
    pub fn run_migrations(&self) -> MigrateResult<MigrationRunReport> {
        let pending = self.plan()?;
        if pending.is_empty() {
            log::info!("No pending migrations, schema is up to date");
            return Ok(MigrationRunReport::default());
        }

        log::info!("Applying {} pending migration(s)", pending.len());
        let mut report = MigrationRunReport::default();
        for script in pending {
            self.run_single_migration(&script)?;
            report.applied.push(script.version);
        }
        Ok(report)
    }

    /// Apply one script in its own transaction, keeping the ledger honest
    /// at every step.
    pub fn run_single_migration(&self, script: &MigrationScript) -> MigrateResult<()> {
        let version = script.version.as_str();
        log::info!("Applying migration {version}");

        // Recorded before anything runs: a crash from here on leaves a
        // failed row behind rather than nothing.
        self.ledger.record_attempt(self.db, version)?;

        let sql = match script.read() {
            Ok(sql) => sql,
            Err(source) => {
                return Err(self.fail(
                    version,
                    MigrateError::Read {
                        version: version.to_string(),
                        path: script.path.display().to_string(),
                        source,
                    },
                ));
            }
        };

        let tx = match Transaction::begin(self.db) {
            Ok(tx) => tx,
            Err(source) => {
                return Err(self.fail(
                    version,
                    MigrateError::Execution {
                        version: version.to_string(),
                        stage: "begin",
                        source,
                    },
                ));
            }
        };

        let executed = tx.db().execute_batch(&sql);
        if let Err(source) = executed {
            Self::close(tx, version);
            return Err(self.fail(
                version,
                MigrateError::Execution {
                    version: version.to_string(),
                    stage: "execute",
                    source,
                },
            ));
        }

        let marked = self.ledger.mark_applied(tx.db(), version);
        if let Err(err) = marked {
            Self::close(tx, version);
            return Err(self.fail(version, err));
        }

        if let Err(source) = tx.commit() {
            return Err(self.fail(
                version,
                MigrateError::Commit {
                    version: version.to_string(),
                    source,
                },
            ));
        }

        log::info!("Applied migration {version}");
        Ok(())
    }

    /// One entry per known version, from scripts on disk and ledger rows.
    ///
    /// Unlike [`plan`](Self::plan) this does not fail when a version is
    /// blocked; the failed version is reported instead. Read-only: without a
    /// ledger table every script is pending and nothing is created.
    pub fn status(&self) -> MigrateResult<Vec<MigrationStatus>> {
        let scripts = self.get_available_migrations()?;
        let records = if self.ledger.exists(self.db)? {
            self.ledger.records(self.db)?
        } else {
            Vec::new()
        };
        Ok(build_report(scripts, records))
    }

    /// Roll back a transaction whose work failed.
    fn close(tx: Transaction<'_>, version: &str) {
        if let Err(e) = tx.rollback() {
            log::warn!("Rollback of {version} failed: {e}");
        }
    }

    /// Log `err`, write it to the ledger row of `version`, and hand it back.
    ///
    /// Runs after the script's transaction has been closed, so the ledger
    /// write is its own autocommit statement and survives the rollback.
    fn fail(&self, version: &str, err: MigrateError) -> MigrateError {
        log::error!("{err}");
        if let Err(record_err) = self.ledger.record_failure(self.db, version, &err.to_string()) {
            log::error!("Could not record failure of {version} in the ledger: {record_err}");
        }
        err
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
