//! sl-db - Database abstraction layer for Spendlog
//!
//! This crate provides the `Database` trait consumed by the migration runner
//! and its DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{Database, Row, Transaction};
