//! Criteria-to-SQL compilation.
//!
//! The compiler turns a typed [`Criteria`](crate::criteria::Criteria) tree
//! and an optional [`OrderBy`](crate::criteria::OrderBy) into two commands
//! sharing one predicate: a page query with a skip/take window and a count
//! query. Parameter names are unique per statement.

mod compiler;
mod params;

pub use compiler::{compile, CompiledQuery};
pub use params::ParamScope;
