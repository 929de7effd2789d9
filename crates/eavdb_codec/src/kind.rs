//! Stored value type tags.

use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};

/// The type tag stored alongside each EAV property row.
///
/// Codes are part of the on-disk format and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueKind {
    /// Explicit null marker.
    Null = 0,
    /// Boolean, stored as integer 0 or 1.
    Bool = 1,
    /// Signed 64-bit integer.
    Integer = 2,
    /// 64-bit float.
    Float = 3,
    /// Timestamp, stored as microseconds since the Unix epoch.
    Timestamp = 4,
    /// UTF-8 text.
    Text = 5,
    /// Raw bytes.
    Binary = 6,
}

impl ValueKind {
    /// Returns the stored code.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Decodes a stored code.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownKind`] for codes outside the table.
    pub fn from_code(code: i64) -> CodecResult<Self> {
        Ok(match code {
            0 => ValueKind::Null,
            1 => ValueKind::Bool,
            2 => ValueKind::Integer,
            3 => ValueKind::Float,
            4 => ValueKind::Timestamp,
            5 => ValueKind::Text,
            6 => ValueKind::Binary,
            _ => return Err(CodecError::UnknownKind { code }),
        })
    }

    /// Returns a lowercase name, for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Text => "text",
            ValueKind::Binary => "binary",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for kind in [
            ValueKind::Null,
            ValueKind::Bool,
            ValueKind::Integer,
            ValueKind::Float,
            ValueKind::Timestamp,
            ValueKind::Text,
            ValueKind::Binary,
        ] {
            assert_eq!(ValueKind::from_code(kind.code()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(
            ValueKind::from_code(42),
            Err(CodecError::UnknownKind { code: 42 })
        );
    }
}
