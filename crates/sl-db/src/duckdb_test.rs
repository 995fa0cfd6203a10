use super::*;
use crate::traits::Transaction;

fn count(db: &DuckDbBackend, sql: &str) -> i64 {
    let rows = db.query_rows(sql, &[]).unwrap();
    rows[0][0].as_deref().unwrap().parse().unwrap()
}

#[test]
fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[test]
fn test_new_memory_special_case() {
    let db = DuckDbBackend::new(":memory:").unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").unwrap();
    assert!(db.relation_exists("t").unwrap());
}

#[test]
fn test_from_path_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute_batch("CREATE TABLE t (id INT); INSERT INTO t VALUES (1);")
            .unwrap();
    }
    assert!(path.exists());
    let reopened = DuckDbBackend::from_path(&path).unwrap();
    assert_eq!(count(&reopened, "SELECT CAST(COUNT(*) AS VARCHAR) FROM t"), 1);
}

#[test]
fn test_execute_with_params() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE vendors (name VARCHAR, city VARCHAR)")
        .unwrap();
    let affected = db
        .execute(
            "INSERT INTO vendors VALUES (?, ?)",
            &["Corner Shop", "Lyon"],
        )
        .unwrap();
    assert_eq!(affected, 1);

    let rows = db
        .query_rows("SELECT name, city FROM vendors WHERE city = ?", &["Lyon"])
        .unwrap();
    assert_eq!(
        rows,
        vec![vec![Some("Corner Shop".to_string()), Some("Lyon".to_string())]]
    );
}

#[test]
fn test_query_rows_null_is_none() {
    let db = DuckDbBackend::in_memory().unwrap();
    let rows = db
        .query_rows("SELECT CAST(NULL AS VARCHAR), 'x'", &[])
        .unwrap();
    assert_eq!(rows, vec![vec![None, Some("x".to_string())]]);
}

#[test]
fn test_execute_batch_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.execute_batch("SELEC 1").unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(_)));
}

#[test]
fn test_missing_table_classified() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.execute_batch("SELECT * FROM no_such_table").unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)), "{err}");
}

#[test]
fn test_relation_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.relation_exists("nonexistent").unwrap());
    db.execute_batch("CREATE SCHEMA staging; CREATE TABLE staging.t (id INT);")
        .unwrap();
    assert!(db.relation_exists("staging.t").unwrap());
    assert!(!db.relation_exists("t").unwrap());
}

#[test]
fn test_transaction_commit_persists() {
    let db = DuckDbBackend::in_memory().unwrap();
    let tx = Transaction::begin(&db).unwrap();
    tx.db().execute_batch("CREATE TABLE kept (id INT)").unwrap();
    tx.commit().unwrap();
    assert!(db.relation_exists("kept").unwrap());
}

#[test]
fn test_transaction_rollback_discards() {
    let db = DuckDbBackend::in_memory().unwrap();
    let tx = Transaction::begin(&db).unwrap();
    tx.db().execute_batch("CREATE TABLE discarded (id INT)").unwrap();
    tx.rollback().unwrap();
    assert!(!db.relation_exists("discarded").unwrap());
}

#[test]
fn test_transaction_drop_rolls_back() {
    let db = DuckDbBackend::in_memory().unwrap();
    {
        let tx = Transaction::begin(&db).unwrap();
        tx.db().execute_batch("CREATE TABLE abandoned (id INT)").unwrap();
    }
    assert!(!db.relation_exists("abandoned").unwrap());

    // The connection is usable again outside any transaction.
    db.execute_batch("CREATE TABLE after (id INT)").unwrap();
    assert!(db.relation_exists("after").unwrap());
}

#[test]
fn test_transaction_after_failed_statement() {
    let db = DuckDbBackend::in_memory().unwrap();
    {
        let tx = Transaction::begin(&db).unwrap();
        let result = tx
            .db()
            .execute_batch("CREATE TABLE partial (id INT); INSERT INTO missing VALUES (1);");
        assert!(result.is_err());
    }
    assert!(!db.relation_exists("partial").unwrap());
}

#[test]
fn test_commit_without_begin_fails() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.commit().unwrap_err();
    assert!(matches!(err, DbError::TransactionError { op: "COMMIT", .. }));
}
