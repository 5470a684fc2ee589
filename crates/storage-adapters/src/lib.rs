//! # storage-adapters
//!
//! Implementations of the `MessageRepo` and `FeedbackRepo` ports.
//! `MemoryStore` is always compiled; the SQLite store sits behind `db-sqlite`.

pub mod memory;
#[cfg(feature = "db-sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteStore;
