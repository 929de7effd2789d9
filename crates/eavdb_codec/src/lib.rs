//! # EavDB Codec
//!
//! The value box shared by properties and criteria operands.
//!
//! This crate provides:
//! - [`Value`], a tagged union of null, boolean, integer, float, timestamp,
//!   text and binary values
//! - [`Timestamp`] with explicit precision coercion ([`Precision`])
//! - [`ValueKind`], the stable type tag stored next to every EAV row
//! - [`BlobHandle`], a reference to a binary value kept out of line
//!
//! ## Absent vs. null
//!
//! A property that does not exist is represented by the *absence* of a
//! value (`Option::None` at the collection level). [`Value::Null`] is an
//! explicit null marker and is stored as a row of its own.
//!
//! ## Usage
//!
//! ```
//! use eavdb_codec::{Precision, Timestamp, Value, ValueKind};
//!
//! let ts = Timestamp::from_unix_micros(1_700_000_000_123_456).unwrap();
//! let value = Value::from(ts).coerce(Precision::Millis);
//! assert_eq!(value.kind(), ValueKind::Timestamp);
//! assert_eq!(
//!     value.as_timestamp().unwrap().unix_micros(),
//!     1_700_000_000_123_000
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod blob;
mod error;
mod kind;
mod timestamp;
mod value;

pub use blob::BlobHandle;
pub use error::{CodecError, CodecResult};
pub use kind::ValueKind;
pub use timestamp::{Precision, Timestamp};
pub use value::{Binary, Value};
