//! Transaction manager.

use crate::error::{StoreError, StoreResult};
use eavdb_storage::Connection;
use tracing::{debug, trace, warn};

/// Reference-counted transaction bracket over one connection.
///
/// The manager owns the connection exclusively. Every engine operation
/// runs inside [`TransactionManager::run`], which nests under whatever
/// bracket the caller has opened.
pub struct TransactionManager {
    conn: Box<dyn Connection>,
    depth: usize,
    poisoned: bool,
}

impl TransactionManager {
    /// Creates a manager over a closed connection.
    pub fn new(conn: Box<dyn Connection>) -> Self {
        Self {
            conn,
            depth: 0,
            poisoned: false,
        }
    }

    /// Returns the current nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true while a bracket is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.depth > 0
    }

    /// Returns true if a nested rollback has doomed the current bracket.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Opens a bracket.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the connection cannot be opened or the backend
    /// transaction cannot be started. The depth is unchanged in that case.
    pub fn begin(&mut self) -> StoreResult<()> {
        if self.depth == 0 {
            self.conn.open()?;
            if let Err(e) = self.conn.begin() {
                let _ = self.conn.close();
                return Err(e.into());
            }
            self.poisoned = false;
            debug!("began backend transaction");
        } else {
            trace!(depth = self.depth + 1, "nested begin");
        }
        self.depth += 1;
        Ok(())
    }

    /// Closes a bracket, committing if it is the outermost one.
    ///
    /// # Errors
    ///
    /// - `IllegalState` if no bracket is open
    /// - `TransactionAborted` if a nested rollback poisoned the bracket; the
    ///   backend transaction has been rolled back
    /// - `Backend` if the commit fails; a rollback has been attempted and the
    ///   connection closed
    pub fn commit(&mut self) -> StoreResult<()> {
        if self.depth == 0 {
            return Err(StoreError::illegal_state("commit without begin"));
        }
        self.depth -= 1;
        if self.depth > 0 {
            trace!(depth = self.depth, "nested commit");
            return Ok(());
        }

        if self.poisoned {
            warn!("rolling back nest poisoned by an inner rollback");
            self.finish_rollback()?;
            return Err(StoreError::transaction_aborted(
                "an inner transaction was rolled back",
            ));
        }

        if let Err(e) = self.conn.commit() {
            let _ = self.conn.rollback();
            let _ = self.conn.close();
            self.poisoned = false;
            return Err(e.into());
        }
        debug!("committed backend transaction");
        self.conn.close()?;
        Ok(())
    }

    /// Closes a bracket and dooms the whole nest.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` if no bracket is open, or `Backend` if the
    /// outermost physical rollback fails.
    pub fn rollback(&mut self) -> StoreResult<()> {
        if self.depth == 0 {
            return Err(StoreError::illegal_state("rollback without begin"));
        }
        self.depth -= 1;
        self.poisoned = true;
        if self.depth > 0 {
            trace!(depth = self.depth, "nested rollback");
            return Ok(());
        }
        self.finish_rollback()
    }

    fn finish_rollback(&mut self) -> StoreResult<()> {
        self.poisoned = false;
        let rolled = self.conn.rollback();
        let closed = self.conn.close();
        rolled?;
        closed?;
        debug!("rolled back backend transaction");
        Ok(())
    }

    /// Runs `f` inside a bracket.
    ///
    /// Commits when `f` returns `Ok` and rolls back when it returns `Err`.
    /// The error of `f` is returned unchanged even if the rollback fails.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or of the bracket itself.
    pub fn run<T>(&mut self, f: impl FnOnce(&mut dyn Connection) -> StoreResult<T>) -> StoreResult<T> {
        self.begin()?;
        match f(self.conn.as_mut()) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!(error = %rollback_err, "rollback after failed operation also failed");
                }
                Err(e)
            }
        }
    }

    /// Returns the connection for use inside an open bracket.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` when no bracket is open.
    pub fn connection(&mut self) -> StoreResult<&mut dyn Connection> {
        if self.depth == 0 {
            return Err(StoreError::illegal_state("no transaction is open"));
        }
        Ok(self.conn.as_mut())
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("depth", &self.depth)
            .field("poisoned", &self.poisoned)
            .field("connection_open", &self.conn.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eavdb_storage::{Command, RecordingConnection, SqlValue, SqliteConnection};
    use std::sync::Arc;

    fn manager() -> (TransactionManager, Arc<eavdb_storage::ConnectionLog>) {
        let conn = RecordingConnection::new(SqliteConnection::memory());
        let log = conn.log();
        (TransactionManager::new(Box::new(conn)), log)
    }

    fn insert(conn: &mut dyn Connection) -> StoreResult<()> {
        conn.execute(&Command::new(
            "INSERT INTO Objects (Type, Name, Stamp) VALUES ('T', '', 1)",
        ))?;
        Ok(())
    }

    fn count(tm: &mut TransactionManager) -> i64 {
        tm.run(|conn| {
            Ok(conn
                .query_scalar(&Command::new("SELECT COUNT(*) FROM Objects"))?
                .and_then(|v| v.as_i64())
                .unwrap_or(-1))
        })
        .unwrap()
    }

    #[test]
    fn nested_commit_commits_once() {
        let (mut tm, log) = manager();
        tm.begin().unwrap();
        tm.begin().unwrap();
        assert_eq!(tm.depth(), 2);
        tm.commit().unwrap();
        assert_eq!(log.commits(), 0);
        tm.commit().unwrap();
        assert_eq!(log.begins(), 1);
        assert_eq!(log.commits(), 1);
        assert_eq!(log.rollbacks(), 0);
        assert!(!tm.is_open());
    }

    #[test]
    fn nested_rollback_poisons_outer_commit() {
        let (mut tm, log) = manager();
        tm.begin().unwrap();
        insert(tm.connection().unwrap()).unwrap();
        tm.begin().unwrap();
        tm.rollback().unwrap();
        assert!(tm.is_poisoned());
        assert_eq!(log.rollbacks(), 0);

        let err = tm.commit().unwrap_err();
        assert!(matches!(err, StoreError::TransactionAborted { .. }));
        assert_eq!(log.commits(), 0);
        assert_eq!(log.rollbacks(), 1);
        assert!(!tm.is_poisoned());
        assert_eq!(count(&mut tm), 0);
    }

    #[test]
    fn unbalanced_calls_are_illegal() {
        let (mut tm, _) = manager();
        assert!(matches!(tm.commit(), Err(StoreError::IllegalState { .. })));
        assert!(matches!(tm.rollback(), Err(StoreError::IllegalState { .. })));
        assert!(tm.connection().is_err());
    }

    #[test]
    fn run_commits_on_ok() {
        let (mut tm, log) = manager();
        tm.run(insert).unwrap();
        assert_eq!(log.commits(), 1);
        assert_eq!(count(&mut tm), 1);
    }

    #[test]
    fn run_rolls_back_and_keeps_error() {
        let (mut tm, log) = manager();
        let err = tm
            .run(|conn| {
                insert(conn)?;
                Err::<(), _>(StoreError::not_found("thing"))
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(log.rollbacks(), 1);
        assert_eq!(count(&mut tm), 0);
    }

    #[test]
    fn run_nests_inside_open_bracket() {
        let (mut tm, log) = manager();
        tm.begin().unwrap();
        tm.run(insert).unwrap();
        tm.run(insert).unwrap();
        assert_eq!(log.begins(), 1);
        assert_eq!(log.commits(), 0);
        tm.commit().unwrap();
        assert_eq!(log.commits(), 1);
        assert_eq!(count(&mut tm), 2);
    }

    #[test]
    fn failed_inner_run_aborts_outer_bracket() {
        let (mut tm, _) = manager();
        tm.begin().unwrap();
        tm.run(insert).unwrap();
        let _ = tm.run(|_| Err::<(), _>(StoreError::invalid_argument("bad")));
        assert!(matches!(
            tm.commit(),
            Err(StoreError::TransactionAborted { .. })
        ));
        assert_eq!(count(&mut tm), 0);
    }

    #[test]
    fn scalar_query_goes_through_bracket() {
        let (mut tm, _) = manager();
        let one = tm
            .run(|conn| Ok(conn.query_scalar(&Command::new("SELECT 1"))?))
            .unwrap();
        assert_eq!(one, Some(SqlValue::Integer(1)));
    }
}
