//! SQLite backend for the MCPedia knowledge store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Full-text search uses an FTS5 table
//! that the write path keeps in lockstep with the `entries` table.

mod deadline;
mod encode;
mod lock;
mod query;
mod schema;
mod stats;
mod store;
mod tags;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_DEADLINE, SqliteStore};
