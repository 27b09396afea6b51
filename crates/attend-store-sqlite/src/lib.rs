//! SQLite backend for the attendance store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The ledger's append is a single
//! `INSERT OR IGNORE` against a `UNIQUE` key, so it stays atomic even when
//! several connections or processes share one database file.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
