//! Init command implementation - scaffolds a new Spendlog project

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::InitArgs;

/// Baseline schema of the expense tracker, written as the first migration.
const BASELINE_SCHEMA: &str = r#"-- Baseline schema for the Spendlog expense tracker

CREATE SEQUENCE IF NOT EXISTS vendors_id_seq;
CREATE SEQUENCE IF NOT EXISTS categories_id_seq;
CREATE SEQUENCE IF NOT EXISTS tags_id_seq;
CREATE SEQUENCE IF NOT EXISTS expenses_id_seq;
CREATE SEQUENCE IF NOT EXISTS incomes_id_seq;

CREATE TABLE vendors (
    id          INTEGER PRIMARY KEY DEFAULT nextval('vendors_id_seq'),
    name        VARCHAR NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    description VARCHAR,
    created_at  TIMESTAMP NOT NULL DEFAULT current_timestamp
);

CREATE TABLE categories (
    id         INTEGER PRIMARY KEY DEFAULT nextval('categories_id_seq'),
    name       VARCHAR NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    color      VARCHAR NOT NULL
               CHECK (regexp_full_match(color, '#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})')),
    created_at TIMESTAMP NOT NULL DEFAULT current_timestamp
);

CREATE TABLE tags (
    id         INTEGER PRIMARY KEY DEFAULT nextval('tags_id_seq'),
    name       VARCHAR NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    color      VARCHAR NOT NULL
               CHECK (regexp_full_match(color, '#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})')),
    created_at TIMESTAMP NOT NULL DEFAULT current_timestamp
);

CREATE TABLE expenses (
    id          INTEGER PRIMARY KEY DEFAULT nextval('expenses_id_seq'),
    amount      DECIMAL(12, 2) NOT NULL CHECK (amount > 0),
    description VARCHAR NOT NULL CHECK (length(trim(description)) > 0),
    date        DATE NOT NULL,
    vendor_id   INTEGER REFERENCES vendors (id),
    category_id INTEGER REFERENCES categories (id),
    created_at  TIMESTAMP NOT NULL DEFAULT current_timestamp
);

CREATE TABLE incomes (
    id          INTEGER PRIMARY KEY DEFAULT nextval('incomes_id_seq'),
    amount      DECIMAL(12, 2) NOT NULL CHECK (amount > 0),
    description VARCHAR NOT NULL CHECK (length(trim(description)) > 0),
    date        DATE NOT NULL,
    created_at  TIMESTAMP NOT NULL DEFAULT current_timestamp
);

CREATE TABLE expense_tags (
    expense_id INTEGER NOT NULL REFERENCES expenses (id),
    tag_id     INTEGER NOT NULL REFERENCES tags (id),
    PRIMARY KEY (expense_id, tag_id)
);

CREATE TABLE income_tags (
    income_id INTEGER NOT NULL REFERENCES incomes (id),
    tag_id    INTEGER NOT NULL REFERENCES tags (id),
    PRIMARY KEY (income_id, tag_id)
);

CREATE INDEX idx_expenses_date ON expenses (date);
CREATE INDEX idx_incomes_date ON incomes (date);
"#;

/// Execute the init command
pub(crate) async fn execute(args: &InitArgs) -> Result<()> {
    // Reject names that could cause path traversal or confusing directory names
    if args.name.is_empty()
        || args.name.contains('/')
        || args.name.contains('\\')
        || args.name.contains("..")
        || args.name.starts_with('.')
        || args.name.starts_with('-')
    {
        anyhow::bail!(
            "Invalid project name '{}': must not be empty, contain '/', '\\', '..', or start with '.' or '-'",
            args.name
        );
    }

    let project_dir = Path::new(&args.name);
    if project_dir.exists() {
        anyhow::bail!(
            "Directory '{}' already exists. Choose a different project name.",
            args.name
        );
    }

    println!("Creating new Spendlog project: {}\n", args.name);

    let migrations_dir = project_dir.join("migrations");
    fs::create_dir_all(&migrations_dir)
        .with_context(|| format!("Failed to create directory: {}", migrations_dir.display()))?;

    // Escape YAML special characters in interpolated values
    let safe_name = args.name.replace('"', "\\\"");
    let safe_db_path = args.database_path.replace('"', "\\\"");
    let config_content = format!(
        r#"name: "{safe_name}"

database:
  type: duckdb
  path: "{safe_db_path}"

migrations:
  dir: migrations
  extension: sql
  table: schema_migrations
"#
    );
    fs::write(project_dir.join("spendlog.yml"), config_content)
        .context("Failed to write spendlog.yml")?;

    fs::write(migrations_dir.join("001_init.sql"), BASELINE_SCHEMA)
        .context("Failed to write baseline migration")?;

    println!("  Created spendlog.yml");
    println!("  Created migrations/001_init.sql");
    println!("\nNext steps:");
    println!("  cd {}", args.name);
    println!("  spendlog migrate");
    Ok(())
}
