//! Error types for the migration runner.

use sl_db::DbError;
use thiserror::Error;

/// Migration runner errors.
///
/// Every variant names the version (or directory) and the stage that failed.
/// None of them are retried; the host process is expected to stop.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A previous run left a version in the failed state (M001).
    #[error(
        "[M001] Migration {version} is recorded as failed: {message}. \
         Repair the database (or fix the script and delete its ledger row) before migrating again"
    )]
    BlockedByFailure { version: String, message: String },

    /// The script directory could not be scanned (M002).
    #[error("[M002] Cannot scan migrations directory {path}: {source}")]
    Discovery {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Two script files map to the same version (M003).
    #[error("[M003] Duplicate migration version {version}: {first} and {second}")]
    DuplicateVersion {
        version: String,
        first: String,
        second: String,
    },

    /// A script's content could not be read (M004).
    #[error("[M004] Cannot read migration {version} from {path}: {source}")]
    Read {
        version: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The script's SQL failed; its transaction was rolled back (M005).
    #[error("[M005] Migration {version} failed during {stage}: {source}")]
    Execution {
        version: String,
        stage: &'static str,
        #[source]
        source: DbError,
    },

    /// The transaction could not be committed after execution (M006).
    #[error("[M006] Migration {version} could not be committed: {source}")]
    Commit {
        version: String,
        #[source]
        source: DbError,
    },

    /// A ledger statement failed (M007).
    #[error("[M007] Migration ledger error while trying to {stage}: {source}")]
    Ledger {
        stage: String,
        #[source]
        source: DbError,
    },

    /// A ledger row could not be decoded (M008).
    #[error("[M008] Malformed ledger row: {0}")]
    CorruptLedger(String),

    /// The ledger table name is not a plain SQL identifier (M009).
    #[error("[M009] Ledger table '{0}' must be a plain SQL identifier")]
    InvalidLedgerTable(String),
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// True for the error that requires operator intervention.
    pub fn is_blocked(&self) -> bool {
        matches!(self, MigrateError::BlockedByFailure { .. })
    }
}
