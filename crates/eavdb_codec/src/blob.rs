//! Out-of-line binary value handle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a binary value stored out of line.
///
/// A handle is a lightweight reference; the bytes are fetched lazily by
/// opening a stream over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobHandle {
    /// Backing row identifier.
    pub id: i64,
    /// Length in bytes at the time the handle was produced.
    pub length: i64,
}

impl BlobHandle {
    /// Creates a handle.
    #[must_use]
    pub const fn new(id: i64, length: i64) -> Self {
        Self { id, length }
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}[{}]", self.id, self.length)
    }
}
