//! The migration ledger table.
//!
//! One row per version, overwritten in place on every attempt:
//!
//! | column          | meaning                                   |
//! |-----------------|-------------------------------------------|
//! | `version`       | script file name minus extension (PK)     |
//! | `success`       | whether the most recent attempt committed |
//! | `applied_at`    | time of the most recent attempt           |
//! | `error_message` | empty on success, failure detail otherwise |
//!
//! Writes never use `ON CONFLICT DO UPDATE`: DuckDB refuses to assign an
//! indexed column there, and `success` is indexed. An upsert is an
//! `INSERT .. ON CONFLICT DO NOTHING` followed by an `UPDATE` when the row
//! already existed.
//!
//! `applied_at` is always taken from the database clock, the same expression
//! the column default uses, so rows inserted by hand and rows written here
//! agree on the time zone.

use crate::error::{MigrateError, MigrateResult};
use chrono::NaiveDateTime;
use serde::Serialize;
use sl_core::{TableName, Version};
use sl_db::{Database, Row};
use std::collections::HashSet;

/// Database clock for `applied_at`, shared by the column default and every
/// ledger write.
const NOW: &str = "CAST(current_timestamp AS TIMESTAMP)";

/// `CAST(ts AS VARCHAR)` drops trailing zero fractions, so reads accept any.
const TIMESTAMP_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub version: Version,
    pub success: bool,
    pub applied_at: NaiveDateTime,
    pub error_message: String,
}

/// Statements against one ledger table.
#[derive(Debug, Clone)]
pub struct Ledger {
    table: TableName,
}

fn ledger_err(stage: impl Into<String>) -> impl FnOnce(sl_db::DbError) -> MigrateError {
    let stage = stage.into();
    move |source| MigrateError::Ledger { stage, source }
}

fn column<'r>(row: &'r Row, idx: usize, name: &str) -> MigrateResult<&'r str> {
    row.get(idx)
        .and_then(|v| v.as_deref())
        .ok_or_else(|| MigrateError::CorruptLedger(format!("missing column '{name}'")))
}

impl Ledger {
    /// Ledger bound to `table`.
    ///
    /// The name is spliced into every ledger statement, so anything but a
    /// plain identifier is refused.
    pub fn new(table: TableName) -> MigrateResult<Self> {
        if !table.is_plain_identifier() {
            return Err(MigrateError::InvalidLedgerTable(table.into_inner()));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Create the ledger table and its indexes if they do not exist.
    pub fn initialize(&self, db: &dyn Database) -> MigrateResult<()> {
        let t = &self.table;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {t} (
                 version       VARCHAR PRIMARY KEY,
                 success       BOOLEAN NOT NULL DEFAULT false,
                 applied_at    TIMESTAMP NOT NULL DEFAULT {NOW},
                 error_message VARCHAR DEFAULT ''
             );
             CREATE INDEX IF NOT EXISTS idx_{t}_version ON {t} (version);
             CREATE INDEX IF NOT EXISTS idx_{t}_success ON {t} (success);"
        );
        db.execute_batch(&ddl)
            .map_err(ledger_err(format!("create ledger table {t}")))
    }

    /// Whether the ledger table has been created.
    pub fn exists(&self, db: &dyn Database) -> MigrateResult<bool> {
        db.relation_exists(&self.table)
            .map_err(ledger_err(format!("look up ledger table {}", self.table)))
    }

    /// Mark `version` as being attempted: `success = false`, no error, fresh
    /// timestamp.
    pub fn record_attempt(&self, db: &dyn Database, version: &str) -> MigrateResult<()> {
        self.upsert_failed(db, version, "")
            .map_err(ledger_err(format!("record attempt of {version}")))
    }

    /// Record a failed attempt of `version` with `message`.
    ///
    /// Must run outside any transaction the failure happened in, so that the
    /// record survives that transaction's rollback.
    pub fn record_failure(
        &self,
        db: &dyn Database,
        version: &str,
        message: &str,
    ) -> MigrateResult<()> {
        self.upsert_failed(db, version, message)
            .map_err(ledger_err(format!("record failure of {version}")))
    }

    fn upsert_failed(
        &self,
        db: &dyn Database,
        version: &str,
        message: &str,
    ) -> sl_db::DbResult<()> {
        let t = &self.table;
        let inserted = db.execute(
            &format!(
                "INSERT INTO {t} (version, success, applied_at, error_message) \
                 VALUES (?, false, {NOW}, ?) \
                 ON CONFLICT (version) DO NOTHING"
            ),
            &[version, message],
        )?;
        if inserted == 0 {
            db.execute(
                &format!(
                    "UPDATE {t} SET success = false, applied_at = {NOW}, \
                     error_message = ? WHERE version = ?"
                ),
                &[message, version],
            )?;
        }
        Ok(())
    }

    /// Mark `version` applied. Called on the transaction that ran the script.
    pub fn mark_applied(&self, db: &dyn Database, version: &str) -> MigrateResult<()> {
        let t = &self.table;
        let updated = db
            .execute(
                &format!(
                    "UPDATE {t} SET success = true, applied_at = {NOW}, \
                     error_message = '' WHERE version = ?"
                ),
                &[version],
            )
            .map_err(ledger_err(format!("mark {version} applied")))?;
        if updated != 1 {
            return Err(MigrateError::CorruptLedger(format!(
                "expected one ledger row for {version}, updated {updated}"
            )));
        }
        Ok(())
    }

    /// The failed row with the greatest version, if any.
    pub fn last_failed(&self, db: &dyn Database) -> MigrateResult<Option<MigrationRecord>> {
        let t = &self.table;
        let rows = db
            .query_rows(
                &format!(
                    "SELECT version, CAST(success AS VARCHAR), CAST(applied_at AS VARCHAR), \
                     COALESCE(error_message, '') FROM {t} \
                     WHERE success = false ORDER BY version DESC LIMIT 1"
                ),
                &[],
            )
            .map_err(ledger_err("look up failed migrations"))?;
        rows.first().map(Self::decode).transpose()
    }

    /// Versions whose latest attempt succeeded.
    pub fn applied_versions(&self, db: &dyn Database) -> MigrateResult<HashSet<Version>> {
        let t = &self.table;
        let rows = db
            .query_rows(&format!("SELECT version FROM {t} WHERE success = true"), &[])
            .map_err(ledger_err("list applied migrations"))?;
        rows.iter()
            .map(|row| {
                let v = column(row, 0, "version")?;
                Version::try_new(v)
                    .ok_or_else(|| MigrateError::CorruptLedger("empty version".to_string()))
            })
            .collect()
    }

    /// Every ledger row, unordered.
    pub fn records(&self, db: &dyn Database) -> MigrateResult<Vec<MigrationRecord>> {
        let t = &self.table;
        let rows = db
            .query_rows(
                &format!(
                    "SELECT version, CAST(success AS VARCHAR), CAST(applied_at AS VARCHAR), \
                     COALESCE(error_message, '') FROM {t}"
                ),
                &[],
            )
            .map_err(ledger_err("list ledger rows"))?;
        rows.iter().map(Self::decode).collect()
    }

    fn decode(row: &Row) -> MigrateResult<MigrationRecord> {
        let version = column(row, 0, "version")?;
        let success = match column(row, 1, "success")? {
            "true" => true,
            "false" => false,
            other => {
                return Err(MigrateError::CorruptLedger(format!(
                    "success flag '{other}' for {version}"
                )))
            }
        };
        let applied_at_text = column(row, 2, "applied_at")?;
        let applied_at = NaiveDateTime::parse_from_str(applied_at_text, TIMESTAMP_READ_FORMAT)
            .map_err(|e| {
                MigrateError::CorruptLedger(format!(
                    "applied_at '{applied_at_text}' for {version}: {e}"
                ))
            })?;
        Ok(MigrationRecord {
            version: Version::try_new(version)
                .ok_or_else(|| MigrateError::CorruptLedger("empty version".to_string()))?,
            success,
            applied_at,
            error_message: column(row, 3, "error_message")?.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
