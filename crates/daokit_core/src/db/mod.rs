//! SQLite connection bootstrap.
//!
//! # Responsibility
//! - Open and configure the connections handed out by `SqliteConnectionFactory`.
//! - Install the `users` schema on first use.
//!
//! # Invariants
//! - Schema revision is tracked via `PRAGMA user_version`.
//! - No statement strategy runs against a connection whose schema check failed.

mod open;

pub use open::{open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT, SCHEMA_VERSION};
