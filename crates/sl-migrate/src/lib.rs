//! sl-migrate - Forward-only SQL migration runner for Spendlog
//!
//! Scripts are discovered fresh from a directory on every run, ordered by
//! [`sl_core::compare_versions`], and applied one at a time inside their own
//! transaction. Every attempt is recorded in a ledger table; a version left
//! in the failed state blocks all further runs until an operator clears it.

pub mod discovery;
pub mod error;
pub mod ledger;
pub mod runner;
pub mod status;

pub use discovery::{discover_scripts, MigrationScript};
pub use error::{MigrateError, MigrateResult};
pub use ledger::{Ledger, MigrationRecord};
pub use runner::{MigrationOptions, MigrationRunReport, MigrationRunner};
pub use status::{MigrationState, MigrationStatus};
