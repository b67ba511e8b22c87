//! Core types and shared functionality for kontext.
//!
//! This crate provides:
//! - Response store with SQLite backend
//! - The asymmetric-TTL refresh policy
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod policy;
pub mod response;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use policy::{RefreshPlan, plan_refresh};
pub use response::CachedResponse;
pub use store::{CacheEntry, StoreDb};
