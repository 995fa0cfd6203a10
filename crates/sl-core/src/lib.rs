//! sl-core - Core library for Spendlog
//!
//! This crate provides the shared configuration types and the migration
//! [`Version`] identity with its ordering rules.

pub mod config;
pub mod error;
mod newtype_string;
pub mod table_name;
pub mod version;

pub use config::{Config, DatabaseConfig, DbType, MigrationsConfig};
pub use error::{CoreError, CoreResult};
pub use table_name::TableName;
pub use version::{compare_versions, numeric_prefix, Version};
