//! Error types for EavDB core.

use crate::types::Stamp;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Optimistic concurrency check failed.
    Conflict,
    /// Object or value does not exist.
    NotFound,
    /// Criteria tree cannot be compiled.
    InvalidCriteria,
    /// Caller supplied an invalid argument.
    InvalidArgument,
    /// Backing store failure.
    Backend,
    /// Call is not valid in the current state.
    IllegalState,
    /// The enclosing transaction was rolled back.
    TransactionAborted,
    /// Local I/O failure.
    Io,
}

/// Errors that can occur in EavDB core operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored object is newer than the caller's copy.
    #[error(
        "object {id} was modified: caller has stamp {expected}, store has {actual}; \
         a newer version exists, retrieve before saving"
    )]
    Conflict {
        /// Object ID.
        id: i64,
        /// Stamp held by the caller.
        expected: Stamp,
        /// Stamp held by the store.
        actual: Stamp,
    },

    /// Object or value not found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of what was looked up.
        what: String,
    },

    /// Criteria tree rejected by the compiler.
    #[error("invalid criteria: {message}")]
    InvalidCriteria {
        /// Why the tree was rejected.
        message: String,
    },

    /// Invalid argument.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument problem.
        message: String,
    },

    /// Backing store error.
    #[error("backend error: {0}")]
    Backend(#[from] eavdb_storage::StorageError),

    /// Operation not permitted in current state.
    #[error("illegal state: {message}")]
    IllegalState {
        /// Description of why the call is invalid.
        message: String,
    },

    /// Transaction was aborted.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for abort.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates an invalid criteria error.
    pub fn invalid_criteria(message: impl Into<String>) -> Self {
        Self::InvalidCriteria {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an illegal state error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// Creates a transaction aborted error.
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Returns the error's classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Conflict { .. } => ErrorKind::Conflict,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::InvalidCriteria { .. } => ErrorKind::InvalidCriteria,
            StoreError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            StoreError::Backend(_) => ErrorKind::Backend,
            StoreError::IllegalState { .. } => ErrorKind::IllegalState,
            StoreError::TransactionAborted { .. } => ErrorKind::TransactionAborted,
            StoreError::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns true if the caller can reasonably retry after refreshing
    /// its state.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Conflict | ErrorKind::NotFound | ErrorKind::TransactionAborted
        )
    }
}

impl From<eavdb_codec::CodecError> for StoreError {
    fn from(err: eavdb_codec::CodecError) -> Self {
        StoreError::InvalidArgument {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_tells_caller_to_retrieve() {
        let err = StoreError::Conflict {
            id: 7,
            expected: Stamp::new(10),
            actual: Stamp::new(20),
        };
        let text = err.to_string();
        assert!(text.contains("object 7"));
        assert!(text.contains("retrieve before saving"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_recoverable());
    }

    #[test]
    fn backend_errors_are_not_recoverable() {
        let err = StoreError::from(eavdb_storage::StorageError::NotOpen);
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(!err.is_recoverable());
    }
}
