//! # EavDB Storage
//!
//! Backing-store connection trait and implementations for EavDB.
//!
//! This crate is the lowest layer of EavDB. A [`Connection`] executes
//! parameterized text commands against a relational store; it knows nothing
//! about objects, properties, or criteria. EavDB owns all query text.
//!
//! ## Design Principles
//!
//! - Connections are opened and closed explicitly by their owner
//! - One backend transaction at a time per connection
//! - Named parameters (`:name`) only; values travel as [`SqlValue`]
//! - Must be `Send` so a connection can move to the thread that serves it
//!
//! ## Available Connections
//!
//! - [`SqliteConnection`] - File or in-memory SQLite database
//! - [`RecordingConnection`] - Wrapper that records every physical call
//!
//! ## Example
//!
//! ```rust
//! use eavdb_storage::{Command, Connection, SqlValue, SqliteConnection};
//!
//! let mut conn = SqliteConnection::memory();
//! conn.open().unwrap();
//! conn.begin().unwrap();
//! let id = conn
//!     .query_scalar(
//!         &Command::new("INSERT INTO Objects (Type, Name, Stamp) VALUES (:t, '', 1) RETURNING ID")
//!             .bind("t", "Invoice"),
//!     )
//!     .unwrap();
//! assert_eq!(id, Some(SqlValue::Integer(1)));
//! conn.commit().unwrap();
//! conn.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod connection;
mod error;
mod recording;
pub mod schema;
mod sqlite;
mod value;

pub use command::{Command, Row};
pub use connection::Connection;
pub use error::{StorageError, StorageResult};
pub use recording::{ConnectionLog, RecordingConnection};
pub use sqlite::{SqliteConfig, SqliteConnection, SqliteTarget};
pub use value::SqlValue;
