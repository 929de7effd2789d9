//! Connection trait definition.

use crate::command::{Command, Row};
use crate::error::StorageResult;
use crate::value::SqlValue;

/// A connection to the relational backing store.
///
/// Connections are **physical**: `begin`/`commit`/`rollback` map directly to
/// backend transactions. Nesting of logical transactions is layered on top by
/// EavDB's transaction manager; a connection never sees more than one
/// backend transaction at a time.
///
/// # Invariants
///
/// - `open` must succeed before any other call except `is_open`
/// - `commit`/`rollback` require a preceding `begin`
/// - `close` discards any uncommitted backend transaction
/// - Connections must be `Send` so they can be handed to a serving thread
///
/// # Implementors
///
/// - [`super::SqliteConnection`] - SQLite file or in-memory database
/// - [`super::RecordingConnection`] - Records calls made to an inner connection
pub trait Connection: Send {
    /// Opens the physical connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is already open or the store is
    /// unreachable.
    fn open(&mut self) -> StorageResult<()>;

    /// Closes the physical connection.
    ///
    /// Closing a connection that is not open is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release the connection.
    fn close(&mut self) -> StorageResult<()>;

    /// Returns true if the connection is open.
    fn is_open(&self) -> bool;

    /// Starts a backend transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not open or a transaction is
    /// already active.
    fn begin(&mut self) -> StorageResult<()>;

    /// Commits the active backend transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is active or the commit fails.
    fn commit(&mut self) -> StorageResult<()>;

    /// Rolls back the active backend transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is active or the rollback fails.
    fn rollback(&mut self) -> StorageResult<()>;

    /// Executes a command and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    fn execute(&mut self, command: &Command) -> StorageResult<u64>;

    /// Executes a query and returns all result rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn query(&mut self, command: &Command) -> StorageResult<Vec<Row>>;

    /// Executes a query and returns the first column of the first row.
    ///
    /// Returns `None` if the query produced no rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn query_scalar(&mut self, command: &Command) -> StorageResult<Option<SqlValue>> {
        let mut rows = self.query(command)?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut first = rows.swap_remove(0);
        if first.is_empty() {
            return Ok(None);
        }
        Ok(Some(first.take(0)?))
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn open(&mut self) -> StorageResult<()> {
        (**self).open()
    }

    fn close(&mut self) -> StorageResult<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn begin(&mut self) -> StorageResult<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> StorageResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> StorageResult<()> {
        (**self).rollback()
    }

    fn execute(&mut self, command: &Command) -> StorageResult<u64> {
        (**self).execute(command)
    }

    fn query(&mut self, command: &Command) -> StorageResult<Vec<Row>> {
        (**self).query(command)
    }

    fn query_scalar(&mut self, command: &Command) -> StorageResult<Option<SqlValue>> {
        (**self).query_scalar(command)
    }
}
