//! Response DTOs for the store server API
//!
//! Defines the structure of outgoing HTTP response bodies. The stats and
//! performance endpoints serialize their snapshot types directly.

use serde::Serialize;

/// Response body for the SET operation (POST /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Always "ok"
    pub status: &'static str,
    /// The key that was set
    pub key: String,
    /// Namespace the key was stored in, if not the default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl SetResponse {
    pub fn new(key: String, namespace: Option<String>) -> Self {
        Self {
            status: "ok",
            key,
            namespace,
        }
    }
}

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl GetResponse {
    pub fn new(key: String, value: String, namespace: Option<String>) -> Self {
        Self {
            key,
            value,
            namespace,
        }
    }
}

/// Response body for the DELETE operation (DELETE /delete/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Always "deleted"
    pub status: &'static str,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl DeleteResponse {
    pub fn new(key: String, namespace: Option<String>) -> Self {
        Self {
            status: "deleted",
            key,
            namespace,
        }
    }
}

/// Response body for GET /namespaces
#[derive(Debug, Clone, Serialize)]
pub struct NamespacesResponse {
    pub namespaces: Vec<String>,
    pub count: usize,
}

impl NamespacesResponse {
    pub fn new(namespaces: Vec<String>) -> Self {
        let count = namespaces.len();
        Self { namespaces, count }
    }
}

/// Response body for GET /namespaces/:namespace/keys
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceSizeResponse {
    pub namespace: String,
    pub total_keys: usize,
}

/// Response body for DELETE /namespaces/:namespace
#[derive(Debug, Clone, Serialize)]
pub struct ClearNamespaceResponse {
    /// Always "cleared"
    pub status: &'static str,
    pub namespace: String,
    pub keys_deleted: usize,
}

impl ClearNamespaceResponse {
    pub fn new(namespace: String, keys_deleted: usize) -> Self {
        Self {
            status: "cleared",
            namespace,
            keys_deleted,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy"
    pub status: &'static str,
    /// Entry count, scoped to the namespace filter when one is given
    pub store_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl HealthResponse {
    pub fn new(store_size: usize, namespace: Option<String>) -> Self {
        Self {
            status: "healthy",
            store_size,
            namespace,
        }
    }
}

/// Response body for POST /compact
#[derive(Debug, Clone, Serialize)]
pub struct CompactResponse {
    /// Always "compaction_started"
    pub status: &'static str,
}

impl CompactResponse {
    pub fn started() -> Self {
        Self {
            status: "compaction_started",
        }
    }
}
