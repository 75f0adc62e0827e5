//! Request and Response models for the store server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{NsQuery, SetRequest};
pub use responses::{
    ClearNamespaceResponse, CompactResponse, DeleteResponse, GetResponse, HealthResponse,
    NamespaceSizeResponse, NamespacesResponse, SetResponse,
};
