//! # EavDB Core
//!
//! Object persistence over an entity-attribute-value layout.
//!
//! This crate provides:
//! - Differential object save, retrieve and delete with optimistic
//!   concurrency ([`Database::save`], [`Database::retrieve`])
//! - Typed search criteria compiled to parameterized SQL ([`criteria`],
//!   [`query`])
//! - Paged search with a total count ([`Database::search`])
//! - Nested logical transactions over one connection ([`transaction`])
//! - Chunked streaming of large binary values ([`BlobStream`])
//!
//! The backing store is reached through [`eavdb_storage::Connection`];
//! values are [`eavdb_codec::Value`]s.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod blob;
mod collaborator;
mod config;
pub mod criteria;
mod database;
mod eav;
mod error;
pub mod object;
pub mod query;
mod search;
pub mod transaction;
mod types;

pub use blob::BlobStream;
pub use collaborator::{BusinessObject, HeaderFactory, IdentityCache, NoCache, ObjectFactory, ObjectRef, StoredObject};
pub use config::Config;
pub use criteria::{Criteria, Direction, OrderBy};
pub use database::Database;
pub use error::{ErrorKind, StoreError, StoreResult};
pub use object::{Link, LinkedObject, Links, LinksBuilder, Properties, PropertiesBuilder, Property, RetrieveResult, SaveResult};
pub use search::SearchResult;
pub use transaction::TransactionManager;
pub use types::{LinkState, ObjectHeader, PropertyState, Stamp};

pub use eavdb_codec::{Binary, BlobHandle, Precision, Timestamp, Value, ValueKind};
