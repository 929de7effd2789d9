//! Connection wrapper that records physical calls.

use crate::command::{Command, Row};
use crate::connection::Connection;
use crate::error::StorageResult;
use crate::value::SqlValue;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
struct LogState {
    opens: usize,
    closes: usize,
    begins: usize,
    commits: usize,
    rollbacks: usize,
    commands: Vec<String>,
}

/// Shared record of the calls made through a [`RecordingConnection`].
///
/// The log is shared through an `Arc`, so a test can keep a handle to it
/// after the connection has been moved into a database.
#[derive(Debug, Default)]
pub struct ConnectionLog {
    state: Mutex<LogState>,
}

impl ConnectionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physical opens.
    #[must_use]
    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    /// Number of physical closes.
    #[must_use]
    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    /// Number of backend transactions started.
    #[must_use]
    pub fn begins(&self) -> usize {
        self.state.lock().begins
    }

    /// Number of backend commits.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    /// Number of backend rollbacks.
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }

    /// Text of every command executed, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }

    /// Number of executed commands whose text contains `fragment`.
    #[must_use]
    pub fn count_matching(&self, fragment: &str) -> usize {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|text| text.contains(fragment))
            .count()
    }

    /// Resets all counters and the command list.
    pub fn clear(&self) {
        *self.state.lock() = LogState::default();
    }
}

/// A [`Connection`] that forwards to an inner connection and records each
/// successful physical call in a [`ConnectionLog`].
#[derive(Debug)]
pub struct RecordingConnection<C> {
    inner: C,
    log: Arc<ConnectionLog>,
}

impl<C: Connection> RecordingConnection<C> {
    /// Wraps `inner` with a fresh log.
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self::with_log(inner, Arc::new(ConnectionLog::new()))
    }

    /// Wraps `inner`, recording into an existing log.
    #[must_use]
    pub fn with_log(inner: C, log: Arc<ConnectionLog>) -> Self {
        Self { inner, log }
    }

    /// Returns a handle to the log.
    #[must_use]
    pub fn log(&self) -> Arc<ConnectionLog> {
        Arc::clone(&self.log)
    }

    /// Returns the inner connection.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwraps the inner connection.
    #[must_use]
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn record(&self, f: impl FnOnce(&mut LogState)) {
        f(&mut self.log.state.lock());
    }
}

impl<C: Connection> Connection for RecordingConnection<C> {
    fn open(&mut self) -> StorageResult<()> {
        self.inner.open()?;
        self.record(|s| s.opens += 1);
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let was_open = self.inner.is_open();
        self.inner.close()?;
        if was_open {
            self.record(|s| s.closes += 1);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn begin(&mut self) -> StorageResult<()> {
        self.inner.begin()?;
        self.record(|s| s.begins += 1);
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.inner.commit()?;
        self.record(|s| s.commits += 1);
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.inner.rollback()?;
        self.record(|s| s.rollbacks += 1);
        Ok(())
    }

    fn execute(&mut self, command: &Command) -> StorageResult<u64> {
        self.record(|s| s.commands.push(command.text().to_string()));
        self.inner.execute(command)
    }

    fn query(&mut self, command: &Command) -> StorageResult<Vec<Row>> {
        self.record(|s| s.commands.push(command.text().to_string()));
        self.inner.query(command)
    }

    fn query_scalar(&mut self, command: &Command) -> StorageResult<Option<SqlValue>> {
        self.record(|s| s.commands.push(command.text().to_string()));
        self.inner.query_scalar(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteConnection;

    #[test]
    fn counts_physical_calls() {
        let mut conn = RecordingConnection::new(SqliteConnection::memory());
        let log = conn.log();

        conn.open().unwrap();
        conn.begin().unwrap();
        conn.commit().unwrap();
        conn.begin().unwrap();
        conn.rollback().unwrap();
        conn.close().unwrap();
        conn.close().unwrap();

        assert_eq!(log.opens(), 1);
        assert_eq!(log.begins(), 2);
        assert_eq!(log.commits(), 1);
        assert_eq!(log.rollbacks(), 1);
        assert_eq!(log.closes(), 1);
    }

    #[test]
    fn records_command_text() {
        let mut conn = RecordingConnection::new(SqliteConnection::memory());
        let log = conn.log();
        conn.open().unwrap();
        conn.query_scalar(&Command::new("SELECT COUNT(*) FROM Objects"))
            .unwrap();
        conn.execute(&Command::new("DELETE FROM Links")).unwrap();

        assert_eq!(log.commands().len(), 2);
        assert_eq!(log.count_matching("FROM Objects"), 1);

        log.clear();
        assert!(log.commands().is_empty());
        assert_eq!(log.opens(), 0);
    }

    #[test]
    fn failed_calls_are_not_counted() {
        let mut conn = RecordingConnection::new(SqliteConnection::memory());
        let log = conn.log();
        assert!(conn.begin().is_err());
        assert_eq!(log.begins(), 0);
    }
}
