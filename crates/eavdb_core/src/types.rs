//! Core type definitions for EavDB.

use eavdb_codec::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optimistic concurrency token.
///
/// A stamp is a tick count (microseconds since the Unix epoch) assigned by
/// the engine on every structural write. Stamps of one object strictly
/// increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Stamp(pub i64);

impl Stamp {
    /// The stamp of an object that was never read from the store.
    pub const NONE: Stamp = Stamp(0);

    /// Creates a stamp from raw ticks.
    #[must_use]
    pub const fn new(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Returns the raw tick value.
    #[must_use]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Returns the current time as ticks.
    #[must_use]
    pub(crate) fn now() -> Self {
        Self(Timestamp::now().unix_micros())
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stamp:{}", self.0)
    }
}

/// Identity and version of a business object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHeader {
    /// Store-assigned ID; 0 until the object was first saved.
    pub id: i64,
    /// Discriminates the kind of object.
    pub type_name: String,
    /// Display name.
    pub name: String,
    /// Concurrency token.
    pub stamp: Stamp,
}

impl ObjectHeader {
    /// Creates the header of an object that was never saved.
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            type_name: type_name.into(),
            name: name.into(),
            stamp: Stamp::NONE,
        }
    }

    /// Creates a header that refers to a stored object.
    pub fn stored(id: i64, type_name: impl Into<String>, name: impl Into<String>, stamp: Stamp) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            name: name.into(),
            stamp,
        }
    }

    /// Returns true if the object has not been saved yet.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id == 0
    }
}

impl fmt::Display for ObjectHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} {:?} ({})", self.type_name, self.id, self.name, self.stamp)
    }
}

/// Change state of a property in a save delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyState {
    /// Property did not exist before.
    New,
    /// Property existed and has a new value.
    Changed,
    /// Property is to be removed.
    Deleted,
    /// Property as read from the store; ignored by save.
    Unchanged,
}

impl PropertyState {
    /// Returns true for states that write a value.
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, PropertyState::New | PropertyState::Changed)
    }
}

/// Change state of a link in a save delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkState {
    /// Edge to be added.
    New,
    /// Edge to be removed.
    Deleted,
}
