//! Test fixtures and database helpers.
//!
//! Every fixture wraps its connection in a
//! [`RecordingConnection`](eavdb_storage::RecordingConnection) so tests can
//! count physical transactions and inspect the issued commands.

use eavdb_core::{Config, Database};
use eavdb_storage::{ConnectionLog, RecordingConnection, SqliteConnection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    log: Arc<ConnectionLog>,
    path: Option<PathBuf>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self::memory_with_config(Config::default())
    }

    /// Creates a new in-memory test database with a custom configuration.
    pub fn memory_with_config(config: Config) -> Self {
        let conn = RecordingConnection::new(SqliteConnection::memory());
        let log = conn.log();
        Self {
            db: Database::new(Box::new(conn), config).expect("Failed to open in-memory database"),
            log,
            path: None,
            _temp_dir: None,
        }
    }

    /// Creates a new test database in a temporary file.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new test database in a temporary file with a custom
    /// configuration.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("test.eavdb");
        let (db, log) = open_recorded(&path, config);
        Self {
            db,
            log,
            path: Some(path),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store path if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the log of the fixture's own connection.
    pub fn log(&self) -> &ConnectionLog {
        &self.log
    }

    /// Opens another database over the same store file.
    ///
    /// # Panics
    ///
    /// Panics for in-memory fixtures, which cannot be shared.
    pub fn second_handle(&self) -> (Database, Arc<ConnectionLog>) {
        let path = self.path.as_ref().expect("in-memory stores cannot be shared");
        open_recorded(path, self.db.config().clone())
    }
}

fn open_recorded(path: &Path, config: Config) -> (Database, Arc<ConnectionLog>) {
    let conn = RecordingConnection::new(SqliteConnection::file(path));
    let log = conn.log();
    let db = Database::new(Box::new(conn), config).expect("Failed to open file database");
    (db, log)
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

impl std::ops::DerefMut for TestDatabase {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.db
    }
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```
/// use eavdb_testkit::with_temp_db;
///
/// let total = with_temp_db(|db| db.search("Nothing", None, None, 0, 10).unwrap().total_count);
/// assert_eq!(total, 0);
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&mut Database) -> R,
{
    let mut test_db = TestDatabase::memory();
    f(&mut test_db.db)
}

/// Runs a test with a temporary file-backed database.
pub fn with_temp_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&mut TestDatabase) -> R,
{
    let mut test_db = TestDatabase::file();
    f(&mut test_db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eavdb_core::{ObjectHeader, Properties};

    #[test]
    fn memory_fixture_records_transactions() {
        let mut db = TestDatabase::memory();
        db.save(&ObjectHeader::new("T", ""), None, &Properties::empty())
            .unwrap();
        assert_eq!(db.log().begins(), 1);
        assert_eq!(db.log().commits(), 1);
        assert!(db.path().is_none());
    }

    #[test]
    fn file_fixture_shares_store() {
        let mut db = TestDatabase::file();
        let saved = db
            .save(&ObjectHeader::new("T", "x"), None, &Properties::empty())
            .unwrap();
        let (mut other, other_log) = db.second_handle();
        assert_eq!(other.header(saved.header.id).unwrap(), Some(saved.header));
        assert_eq!(other_log.commits(), 1);
        assert!(db.path().unwrap().exists());
    }
}
