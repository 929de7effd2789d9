//! # EavDB Testkit
//!
//! Test utilities for EavDB.
//!
//! This crate provides:
//! - Test fixtures over in-memory and temporary-file stores, with a
//!   recorded connection log
//! - An in-memory identity cache
//! - Property-based test generators using proptest
//! - Populated store scenarios
//!
//! ## Usage
//!
//! ```
//! use eavdb_testkit::prelude::*;
//!
//! let mut db = TestDatabase::memory();
//! let customers = scenarios::customers(&mut db, 3);
//! assert_eq!(customers.len(), 3);
//! assert_eq!(db.log().commits(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod fixtures;
pub mod generators;
pub mod scenarios;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::scenarios;
}

pub use cache::*;
pub use fixtures::*;
pub use generators::*;
