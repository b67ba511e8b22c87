//! SQLite-backed persistent store for cached responses.
//!
//! One row per URL, holding the captured response and its expiry. Access
//! goes through tokio-rusqlite so database work runs on a background
//! thread:
//!
//! - WAL mode for concurrent access
//! - Automatic schema migrations
//! - Transactional refresh (policy decision and write commit together)

pub mod connection;
pub mod entries;
pub mod migrations;

pub use crate::Error;

pub use connection::StoreDb;
pub use entries::CacheEntry;
