//! SQLite connection.

use crate::command::{Command, Row};
use crate::connection::Connection;
use crate::error::{StorageError, StorageResult};
use crate::schema;
use crate::value::SqlValue;
use rusqlite::types::ToSql;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

/// Where a [`SqliteConnection`] keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    /// A database file on disk.
    File(PathBuf),
    /// A private in-memory database.
    Memory,
}

/// Configuration for a SQLite connection.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// How long a writer waits for another connection's lock.
    pub busy_timeout: Duration,

    /// Whether to install the EAV schema when the connection opens.
    pub install_schema: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            install_schema: true,
        }
    }
}

impl SqliteConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether the schema is installed on open.
    #[must_use]
    pub const fn install_schema(mut self, value: bool) -> Self {
        self.install_schema = value;
        self
    }
}

/// A [`Connection`] backed by SQLite.
///
/// Backend transactions start with `BEGIN IMMEDIATE`, so the write lock is
/// taken up front and concurrent connections to the same file are
/// serialized instead of failing on lock upgrade.
///
/// An in-memory database lives as long as the `SqliteConnection` value:
/// `close` parks the underlying handle and the next `open` resumes it, so
/// data survives the open/close cycle of each outermost transaction.
pub struct SqliteConnection {
    target: SqliteTarget,
    config: SqliteConfig,
    conn: Option<rusqlite::Connection>,
    parked: Option<rusqlite::Connection>,
    in_transaction: bool,
}

impl SqliteConnection {
    /// Creates an unopened connection to `target`.
    #[must_use]
    pub fn new(target: SqliteTarget, config: SqliteConfig) -> Self {
        Self {
            target,
            config,
            conn: None,
            parked: None,
            in_transaction: false,
        }
    }

    /// Creates an unopened connection to a database file.
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(
            SqliteTarget::File(path.as_ref().to_path_buf()),
            SqliteConfig::default(),
        )
    }

    /// Creates an unopened connection to a fresh in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(SqliteTarget::Memory, SqliteConfig::default())
    }

    /// Returns the connection target.
    #[must_use]
    pub fn target(&self) -> &SqliteTarget {
        &self.target
    }

    /// Returns true if a backend transaction is active.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn handle(&mut self) -> StorageResult<&mut rusqlite::Connection> {
        self.conn.as_mut().ok_or(StorageError::NotOpen)
    }

    fn configure(&self, conn: &rusqlite::Connection) -> StorageResult<()> {
        conn.busy_timeout(self.config.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if self.config.install_schema {
            conn.execute_batch(schema::DDL)?;
        }
        Ok(())
    }
}

/// Binds a command's parameters by `:name` and runs `f` with them.
fn with_named_params<T>(
    command: &Command,
    f: impl FnOnce(&[(&str, &dyn ToSql)]) -> rusqlite::Result<T>,
) -> rusqlite::Result<T> {
    let names: Vec<String> = command
        .params()
        .iter()
        .map(|(name, _)| format!(":{name}"))
        .collect();
    let params: Vec<(&str, &dyn ToSql)> = names
        .iter()
        .zip(command.params())
        .map(|(name, (_, value))| (name.as_str(), value as &dyn ToSql))
        .collect();
    f(params.as_slice())
}

impl Connection for SqliteConnection {
    fn open(&mut self) -> StorageResult<()> {
        if self.conn.is_some() {
            return Err(StorageError::AlreadyOpen);
        }
        let conn = match (&self.target, self.parked.take()) {
            (SqliteTarget::Memory, Some(parked)) => parked,
            (SqliteTarget::Memory, None) => rusqlite::Connection::open_in_memory()?,
            (SqliteTarget::File(path), _) => rusqlite::Connection::open(path)?,
        };
        self.configure(&conn)?;
        debug!(store = ?self.target, "sqlite connection opened");
        self.conn = Some(conn);
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        if self.in_transaction {
            self.in_transaction = false;
            conn.execute_batch("ROLLBACK")?;
        }
        match self.target {
            SqliteTarget::Memory => self.parked = Some(conn),
            SqliteTarget::File(_) => conn.close().map_err(|(_, e)| StorageError::Sqlite(e))?,
        }
        debug!(store = ?self.target, "sqlite connection closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn begin(&mut self) -> StorageResult<()> {
        if self.in_transaction {
            return Err(StorageError::TransactionActive);
        }
        self.handle()?.execute_batch("BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if !self.in_transaction {
            return Err(StorageError::NoTransaction);
        }
        self.handle()?.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if !self.in_transaction {
            return Err(StorageError::NoTransaction);
        }
        // The backend transaction is gone even if ROLLBACK reports an error.
        self.in_transaction = false;
        self.handle()?.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn execute(&mut self, command: &Command) -> StorageResult<u64> {
        trace!(sql = command.text(), "execute");
        let conn = self.handle()?;
        let mut stmt = conn.prepare_cached(command.text())?;
        let affected = with_named_params(command, |params| stmt.execute(params))?;
        Ok(affected as u64)
    }

    fn query(&mut self, command: &Command) -> StorageResult<Vec<Row>> {
        trace!(sql = command.text(), "query");
        let conn = self.handle()?;
        let mut stmt = conn.prepare_cached(command.text())?;
        let columns = stmt.column_count();
        let rows = with_named_params(command, |params| {
            let mut cursor = stmt.query(params)?;
            let mut rows = Vec::new();
            while let Some(row) = cursor.next()? {
                let mut values = Vec::with_capacity(columns);
                for index in 0..columns {
                    values.push(SqlValue::from_value_ref(row.get_ref(index)?));
                }
                rows.push(Row::new(values));
            }
            Ok(rows)
        })?;
        Ok(rows)
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("target", &self.target)
            .field("is_open", &self.conn.is_some())
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}
