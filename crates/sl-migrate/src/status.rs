//! Per-version status report combining the ledger with the scripts on disk.

use crate::discovery::MigrationScript;
use crate::ledger::MigrationRecord;
use chrono::NaiveDateTime;
use serde::Serialize;
use sl_core::{compare_versions, Version};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Where a version stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    /// Latest attempt committed.
    Applied,
    /// Latest attempt failed (or crashed mid-run); blocks further runs.
    Failed,
    /// Script on disk, never successfully applied.
    Pending,
    /// Applied according to the ledger, but its script is gone.
    Orphaned,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationState::Applied => write!(f, "applied"),
            MigrationState::Failed => write!(f, "failed"),
            MigrationState::Pending => write!(f, "pending"),
            MigrationState::Orphaned => write!(f, "orphaned"),
        }
    }
}

/// One line of the status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub version: Version,
    pub state: MigrationState,
    pub applied_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub path: Option<PathBuf>,
}

/// Merge scripts and ledger rows into one report sorted in run order.
pub(crate) fn build_report(
    scripts: Vec<MigrationScript>,
    records: Vec<MigrationRecord>,
) -> Vec<MigrationStatus> {
    let mut by_version: HashMap<Version, MigrationRecord> = records
        .into_iter()
        .map(|r| (r.version.clone(), r))
        .collect();

    let mut report: Vec<MigrationStatus> = scripts
        .into_iter()
        .map(|script| match by_version.remove(&script.version) {
            Some(record) => from_record(record, Some(script.path)),
            None => MigrationStatus {
                version: script.version,
                state: MigrationState::Pending,
                applied_at: None,
                error_message: None,
                path: Some(script.path),
            },
        })
        .collect();

    report.extend(by_version.into_values().map(|record| from_record(record, None)));
    report.sort_by(|a, b| compare_versions(&a.version, &b.version));
    report
}

fn from_record(record: MigrationRecord, path: Option<PathBuf>) -> MigrationStatus {
    let state = match (record.success, path.is_some()) {
        (false, _) => MigrationState::Failed,
        (true, true) => MigrationState::Applied,
        (true, false) => MigrationState::Orphaned,
    };
    MigrationStatus {
        version: record.version,
        state,
        applied_at: Some(record.applied_at),
        error_message: (!record.error_message.is_empty()).then_some(record.error_message),
        path,
    }
}
