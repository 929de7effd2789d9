//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The SQLite driver reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The connection is not open.
    #[error("connection is not open")]
    NotOpen,

    /// The connection is already open.
    #[error("connection is already open")]
    AlreadyOpen,

    /// A commit or rollback was requested with no backend transaction.
    #[error("no backend transaction is active")]
    NoTransaction,

    /// A backend transaction is already active.
    #[error("a backend transaction is already active")]
    TransactionActive,

    /// A row did not contain the requested column.
    #[error("row has no column {index}")]
    MissingColumn {
        /// Zero-based column index.
        index: usize,
    },

    /// A column held a value of an unexpected type.
    #[error("column {index} has type {actual}, expected {expected}")]
    TypeMismatch {
        /// Zero-based column index.
        index: usize,
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: &'static str,
    },
}

impl StorageError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(index: usize, expected: &'static str, actual: &'static str) -> Self {
        Self::TypeMismatch {
            index,
            expected,
            actual,
        }
    }
}
