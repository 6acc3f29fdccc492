//! # storage-adapters
//!
//! Implementations of the `ProfileStore`, `SwipeStore`, `MatchStore` and
//! `MessageStore` ports.
//!
//! - [`MemoryStore`]: process-local, always compiled. Used by tests and the demo.
//! - `SqliteStore`: file or in-memory SQLite through sqlx (feature `db-sqlite`).

pub mod memory;
#[cfg(feature = "db-sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteStore;
