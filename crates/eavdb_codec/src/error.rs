//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur when converting values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A stored type tag is not known.
    #[error("unknown value kind code {code}")]
    UnknownKind {
        /// The stored code.
        code: i64,
    },

    /// A timestamp is outside the representable range.
    #[error("timestamp out of range: {micros} microseconds")]
    TimestampOutOfRange {
        /// Microseconds since the Unix epoch.
        micros: i64,
    },
}
