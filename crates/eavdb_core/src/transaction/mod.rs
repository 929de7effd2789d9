//! Nested logical transactions over one physical connection.
//!
//! Logical brackets nest freely; only the outermost bracket touches the
//! backend:
//! - the first `begin` opens the connection and starts a backend transaction
//! - the matching last `commit` commits and closes it
//! - any `rollback` inside the nest poisons it, and the outermost bracket
//!   then rolls back no matter how it is closed

mod manager;

pub use manager::TransactionManager;
