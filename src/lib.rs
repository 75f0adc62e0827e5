//! walcache - An in-memory key-value store over HTTP
//!
//! Provides bounded LRU storage with TTL expiration, namespace isolation,
//! and crash-recoverable persistence via a write-ahead log.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod perf;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use store::KvStore;
pub use tasks::{spawn_compactor_task, spawn_sweeper_task};
