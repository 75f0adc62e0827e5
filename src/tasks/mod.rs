//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL sweeper: removes expired entries at configured intervals
//! - Compactor: rewrites the WAL once it crosses the record threshold

mod compactor;
mod sweeper;

pub use compactor::spawn_compactor_task;
pub use sweeper::spawn_sweeper_task;
