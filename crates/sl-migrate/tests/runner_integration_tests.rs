//! End-to-end tests for the migration runner against DuckDB.
//!
//! Each test builds a scratch script directory, runs the public runner API,
//! and checks both the ledger table and the schema it produced.

use sl_db::{Database, DuckDbBackend};
use sl_migrate::{MigrateError, MigrationOptions, MigrationRunner, MigrationState};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

// ── Helpers ────────────────────────────────────────────────────────────

fn write_script(dir: &Path, name: &str, sql: &str) {
    fs::write(dir.join(name), sql).unwrap();
}

fn scalar(db: &dyn Database, sql: &str) -> String {
    let rows = db.query_rows(sql, &[]).unwrap();
    rows[0][0].clone().unwrap()
}

/// `(success, error_message)` for every ledger row, ordered by version.
fn ledger(db: &dyn Database) -> Vec<(String, bool, String)> {
    db.query_rows(
        "SELECT version, CAST(success AS VARCHAR), COALESCE(error_message, '') \
         FROM schema_migrations ORDER BY version",
        &[],
    )
    .unwrap()
    .into_iter()
    .map(|r| {
        (
            r[0].clone().unwrap(),
            r[1].as_deref() == Some("true"),
            r[2].clone().unwrap(),
        )
    })
    .collect()
}

fn runner<'a>(db: &'a DuckDbBackend, dir: &Path) -> MigrationRunner<'a> {
    let runner = MigrationRunner::new(db, MigrationOptions::new(dir)).unwrap();
    runner.initialize().unwrap();
    runner
}

// ── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn test_fresh_database_applies_all_scripts_in_order() {
    let dir = tempdir().unwrap();
    write_script(
        dir.path(),
        "001_init.sql",
        "CREATE TABLE expenses (id INTEGER, amount DECIMAL(12, 2));",
    );
    write_script(
        dir.path(),
        "002_seed.sql",
        "INSERT INTO expenses VALUES (1, 12.50);",
    );
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, dir.path());

    let report = runner.run_migrations().unwrap();
    let applied: Vec<&str> = report.applied.iter().map(|v| v.as_str()).collect();
    assert_eq!(applied, vec!["001_init", "002_seed"]);

    assert_eq!(
        ledger(&db),
        vec![
            ("001_init".to_string(), true, String::new()),
            ("002_seed".to_string(), true, String::new()),
        ]
    );
    assert!(db.relation_exists("expenses").unwrap());
    assert_eq!(
        scalar(&db, "SELECT CAST(COUNT(*) AS VARCHAR) FROM expenses WHERE id = 1"),
        "1"
    );

    // Second run: nothing to do, still a success.
    let again = runner.run_migrations().unwrap();
    assert!(again.is_noop());
    assert_eq!(
        scalar(&db, "SELECT CAST(COUNT(*) AS VARCHAR) FROM expenses"),
        "1"
    );
}

#[test]
fn test_initialize_is_idempotent() {
    let dir = tempdir().unwrap();
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, dir.path());
    runner.initialize().unwrap();
    runner.initialize().unwrap();
    assert!(db.relation_exists("schema_migrations").unwrap());
}

#[test]
fn test_ordering_follows_numeric_prefix_not_listing() {
    let dir = tempdir().unwrap();
    // Each script depends on the one before it in numeric order.
    write_script(dir.path(), "10_y.sql", "INSERT INTO log (v) VALUES ('10_y');");
    write_script(dir.path(), "002_x.sql", "INSERT INTO log (v) VALUES ('002_x');");
    write_script(dir.path(), "1_z.sql", "INSERT INTO log (v) VALUES ('1_z');");
    write_script(
        dir.path(),
        "abc.sql",
        "CREATE TABLE log (v VARCHAR, seq INTEGER DEFAULT nextval('log_seq'));",
    );
    write_script(dir.path(), "0_seq.sql", "CREATE SEQUENCE log_seq;");
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, dir.path());

    let report = runner.run_migrations().unwrap();
    let applied: Vec<&str> = report.applied.iter().map(|v| v.as_str()).collect();
    assert_eq!(applied, vec!["0_seq", "abc", "1_z", "002_x", "10_y"]);
    assert_eq!(
        scalar(&db, "SELECT string_agg(v, ',' ORDER BY seq) FROM log"),
        "1_z,002_x,10_y"
    );
}

#[test]
fn test_failing_script_is_atomic() {
    let dir = tempdir().unwrap();
    write_script(
        dir.path(),
        "001_partial.sql",
        "CREATE TABLE categories (id INTEGER);\nINSERT INTO missing_table VALUES (1);",
    );
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, dir.path());

    let err = runner.run_migrations().unwrap_err();
    assert!(matches!(err, MigrateError::Execution { stage: "execute", .. }));
    // The first statement's table must not survive the rollback.
    assert!(!db.relation_exists("categories").unwrap());
}

#[test]
fn test_bad_script_fails_then_blocks() {
    let dir = tempdir().unwrap();
    write_script(dir.path(), "001_init.sql", "CREATE TABLE tags (id INTEGER);");
    write_script(dir.path(), "003_bad.sql", "CREAT TABLE nope (id INTEGER);");
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, dir.path());

    let err = runner.run_migrations().unwrap_err();
    assert!(
        matches!(err, MigrateError::Execution { ref version, .. } if version == "003_bad"),
        "{err}"
    );

    let rows = ledger(&db);
    assert_eq!(rows[0], ("001_init".to_string(), true, String::new()));
    assert_eq!(rows[1].0, "003_bad");
    assert!(!rows[1].1);
    assert!(!rows[1].2.is_empty());

    // A later script is added, but the failed version blocks everything.
    write_script(dir.path(), "004_more.sql", "CREATE TABLE vendors (id INTEGER);");
    let err = runner.run_migrations().unwrap_err();
    match err {
        MigrateError::BlockedByFailure { version, message } => {
            assert_eq!(version, "003_bad");
            assert_eq!(message, rows[1].2);
        }
        other => panic!("expected blocked error, got {other}"),
    }
    assert!(!db.relation_exists("vendors").unwrap());
}

#[test]
fn test_failure_stops_before_later_scripts() {
    let dir = tempdir().unwrap();
    write_script(dir.path(), "001_bad.sql", "SELECT * FROM nowhere;");
    write_script(dir.path(), "002_good.sql", "CREATE TABLE incomes (id INTEGER);");
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, dir.path());

    assert!(runner.run_migrations().is_err());
    assert!(!db.relation_exists("incomes").unwrap());
    let versions: Vec<String> = ledger(&db).into_iter().map(|r| r.0).collect();
    assert_eq!(versions, vec!["001_bad".to_string()]);
}

#[test]
fn test_manual_failed_row_blocks_without_executing() {
    let dir = tempdir().unwrap();
    write_script(dir.path(), "001_init.sql", "CREATE TABLE vendors (id INTEGER);");
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, dir.path());

    db.execute(
        "INSERT INTO schema_migrations (version, success, error_message) VALUES (?, false, ?)",
        &["000_manual", "left over from a crash"],
    )
    .unwrap();

    let err = runner.run_migrations().unwrap_err();
    assert!(err.is_blocked());
    assert!(err.to_string().contains("000_manual"));
    assert!(!db.relation_exists("vendors").unwrap());
    assert_eq!(ledger(&db).len(), 1);
}

#[test]
fn test_operator_clears_failure_and_resumes() {
    let dir = tempdir().unwrap();
    write_script(dir.path(), "001_bad.sql", "CREATE TABLE tags (");
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, dir.path());
    assert!(runner.run_migrations().is_err());
    assert!(runner.run_migrations().unwrap_err().is_blocked());

    // Fix the script and delete the failed ledger row.
    write_script(dir.path(), "001_bad.sql", "CREATE TABLE tags (id INTEGER);");
    db.execute("DELETE FROM schema_migrations WHERE version = ?", &["001_bad"])
        .unwrap();

    let report = runner.run_migrations().unwrap();
    assert_eq!(report.applied.len(), 1);
    assert!(db.relation_exists("tags").unwrap());
}

#[test]
fn test_new_script_applied_on_next_run() {
    let dir = tempdir().unwrap();
    write_script(dir.path(), "001_init.sql", "CREATE TABLE vendors (id INTEGER);");
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, dir.path());
    runner.run_migrations().unwrap();

    write_script(
        dir.path(),
        "002_vendor_name.sql",
        "ALTER TABLE vendors ADD COLUMN name VARCHAR;",
    );
    let report = runner.run_migrations().unwrap();
    let applied: Vec<&str> = report.applied.iter().map(|v| v.as_str()).collect();
    assert_eq!(applied, vec!["002_vendor_name"]);
}

#[test]
fn test_persists_across_connections() {
    let dir = tempdir().unwrap();
    let scripts = dir.path().join("migrations");
    fs::create_dir_all(&scripts).unwrap();
    write_script(&scripts, "001_init.sql", "CREATE TABLE vendors (id INTEGER);");
    let db_path = dir.path().join("spendlog.duckdb");

    {
        let db = DuckDbBackend::from_path(&db_path).unwrap();
        runner(&db, &scripts).run_migrations().unwrap();
    }

    let db = DuckDbBackend::from_path(&db_path).unwrap();
    let runner = runner(&db, &scripts);
    assert!(runner.run_migrations().unwrap().is_noop());
    let status = runner.status().unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].state, MigrationState::Applied);
    assert!(status[0].applied_at.is_some());
}

#[test]
fn test_missing_directory_is_discovery_error() {
    let dir = tempdir().unwrap();
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = runner(&db, &dir.path().join("nope"));
    assert!(matches!(
        runner.run_migrations().unwrap_err(),
        MigrateError::Discovery { .. }
    ));
}
