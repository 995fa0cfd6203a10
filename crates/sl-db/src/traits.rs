//! Database trait definition

use crate::error::DbResult;

/// A result row with every column rendered as text (`None` for SQL NULL).
///
/// Callers that need typed values cast in SQL, e.g.
/// `CAST(success AS VARCHAR)`, and parse the text.
pub type Row = Vec<Option<String>>;

/// Transactional SQL executor used by the migration runner.
///
/// Implementations are blocking and must be Send + Sync so a runner can be
/// moved onto a blocking worker thread. Transaction control is explicit;
/// prefer the [`Transaction`] guard over calling `begin`/`commit` directly.
pub trait Database: Send + Sync {
    /// Execute one statement with positional text parameters, returning
    /// affected rows
    fn execute(&self, sql: &str, params: &[&str]) -> DbResult<usize>;

    /// Execute a batch of statements separated by semicolons
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query with positional text parameters and collect every row
    fn query_rows(&self, sql: &str, params: &[&str]) -> DbResult<Vec<Row>>;

    /// Start an explicit transaction
    fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    fn rollback(&self) -> DbResult<()>;

    /// Check if a table or view exists
    fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// An open transaction that rolls back when dropped without [`commit`].
///
/// Every exit path of a unit of work either commits explicitly or falls
/// through to the rollback in `Drop`, so no transaction is ever left open.
///
/// [`commit`]: Transaction::commit
pub struct Transaction<'a> {
    db: &'a dyn Database,
    finished: bool,
}

impl<'a> Transaction<'a> {
    /// Issue `BEGIN` on `db` and return the guard.
    pub fn begin(db: &'a dyn Database) -> DbResult<Self> {
        db.begin()?;
        Ok(Self {
            db,
            finished: false,
        })
    }

    /// The executor the transaction runs on.
    pub fn db(&self) -> &dyn Database {
        self.db
    }

    /// Commit. If the commit fails the transaction is rolled back before the
    /// error is returned.
    pub fn commit(mut self) -> DbResult<()> {
        self.finished = true;
        if let Err(commit_err) = self.db.commit() {
            // Some engines abort the transaction themselves on a failed
            // COMMIT, in which case this rollback has nothing to do.
            let _ = self.db.rollback();
            return Err(commit_err);
        }
        Ok(())
    }

    /// Roll back explicitly, surfacing any rollback error.
    pub fn rollback(mut self) -> DbResult<()> {
        self.finished = true;
        self.db.rollback()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.db.rollback() {
                log::warn!("Rollback of abandoned transaction failed: {e}");
            }
        }
    }
}
