//! The value box.

use crate::blob::BlobHandle;
use crate::kind::ValueKind;
use crate::timestamp::{Precision, Timestamp};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A binary property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binary {
    /// Bytes held in memory.
    Inline(Bytes),
    /// Bytes held by the store, read through a stream on demand.
    Stored(BlobHandle),
}

impl Binary {
    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Binary::Inline(bytes) => bytes.len() as u64,
            #[allow(clippy::cast_sign_loss)]
            Binary::Stored(handle) => handle.length.max(0) as u64,
        }
    }

    /// Returns true if the value holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the stored handle, if any.
    #[must_use]
    pub fn handle(&self) -> Option<BlobHandle> {
        match self {
            Binary::Stored(handle) => Some(*handle),
            Binary::Inline(_) => None,
        }
    }
}

/// A property value or criteria operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// Point in time.
    Timestamp(Timestamp),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes, inline or stored.
    Binary(Binary),
}

impl Value {
    /// Returns the stored type tag.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Text(_) => ValueKind::Text,
            Value::Binary(_) => ValueKind::Binary,
        }
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for a float that is NaN.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float(f) if f.is_nan())
    }

    /// Returns the value as stored at the given timestamp precision.
    ///
    /// Only timestamps change; every other variant is returned as is.
    #[must_use]
    pub fn coerce(self, precision: Precision) -> Self {
        match self {
            Value::Timestamp(ts) => Value::Timestamp(ts.round_to(precision)),
            other => other,
        }
    }

    /// Returns the boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float payload.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the timestamp payload.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Returns the text payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the binary payload.
    #[must_use]
    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Returns inline bytes, if the value is an inline binary.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Binary(Binary::Inline(bytes)) => Some(bytes),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::Timestamp(Timestamp::from(dt))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Value::Binary(Binary::Inline(bytes))
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(Binary::Inline(Bytes::from(bytes)))
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Binary(Binary::Inline(Bytes::copy_from_slice(bytes)))
    }
}

impl From<BlobHandle> for Value {
    fn from(handle: BlobHandle) -> Self {
        Value::Binary(Binary::Stored(handle))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
