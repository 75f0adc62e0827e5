//! API Module
//!
//! HTTP handlers and routing for the store server REST API. The handlers
//! are thin adapters over the store core; all semantics live in
//! [`crate::store`].

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
