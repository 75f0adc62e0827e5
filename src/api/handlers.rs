//! API Handlers
//!
//! HTTP request handlers for each store server endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::models::{
    ClearNamespaceResponse, CompactResponse, DeleteResponse, GetResponse, HealthResponse,
    NamespaceSizeResponse, NamespacesResponse, NsQuery, SetRequest, SetResponse,
};
use crate::perf::{PerfError, PerfMonitor, PerfSummary};
use crate::store::{KvStore, StatsSnapshot};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The store engine
    pub store: Arc<KvStore>,
    /// Operation timing collector
    pub perf: Arc<PerfMonitor>,
}

impl AppState {
    /// Creates a new AppState around an opened store.
    pub fn new(store: Arc<KvStore>) -> Self {
        Self {
            store,
            perf: Arc::new(PerfMonitor::new()),
        }
    }
}

/// Resolves the effective namespace: the `ns` query parameter wins over the
/// request body, and empty strings mean the default namespace.
fn resolve_namespace(query: Option<String>, body: Option<String>) -> Option<String> {
    query
        .filter(|ns| !ns.is_empty())
        .or_else(|| body.filter(|ns| !ns.is_empty()))
}

/// Handler for POST /set
///
/// Stores a key-value pair with optional TTL and namespace.
pub async fn set_handler(
    State(state): State<AppState>,
    Query(query): Query<NsQuery>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let SetRequest {
        key,
        value,
        ttl,
        namespace,
    } = req;
    let namespace = resolve_namespace(query.ns, namespace);

    let started = Instant::now();
    let result = state
        .store
        .set(namespace.as_deref().unwrap_or(""), &key, value, ttl)
        .await;
    let error = result.as_ref().err().map(|e| e.to_string());
    state
        .perf
        .record("set", started.elapsed(), result.is_ok(), error)
        .await;
    result?;

    Ok(Json(SetResponse::new(key, namespace)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value by key. Absent and expired keys both answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<NsQuery>,
) -> Result<Json<GetResponse>> {
    let namespace = resolve_namespace(query.ns, None);

    let started = Instant::now();
    let value = state
        .store
        .get(namespace.as_deref().unwrap_or(""), &key)
        .await;
    state.perf.record("get", started.elapsed(), true, None).await;

    let value = value.ok_or_else(|| StoreError::NotFound(key.clone()))?;
    Ok(Json(GetResponse::new(key, value, namespace)))
}

/// Handler for DELETE /delete/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<NsQuery>,
) -> Result<Json<DeleteResponse>> {
    let namespace = resolve_namespace(query.ns, None);

    let started = Instant::now();
    let result = state
        .store
        .delete(namespace.as_deref().unwrap_or(""), &key)
        .await;
    let error = result.as_ref().err().map(|e| e.to_string());
    state
        .perf
        .record("delete", started.elapsed(), result.is_ok(), error)
        .await;

    if result? {
        Ok(Json(DeleteResponse::new(key, namespace)))
    } else {
        Err(StoreError::NotFound(key))
    }
}

/// Handler for GET /namespaces
pub async fn list_namespaces_handler(State(state): State<AppState>) -> Json<NamespacesResponse> {
    let namespaces = state.store.list_namespaces().await;
    Json(NamespacesResponse::new(namespaces))
}

/// Handler for GET /namespaces/:namespace/keys
pub async fn namespace_size_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Json<NamespaceSizeResponse> {
    let total_keys = state.store.namespace_size(&namespace).await;
    Json(NamespaceSizeResponse {
        namespace,
        total_keys,
    })
}

/// Handler for DELETE /namespaces/:namespace
pub async fn clear_namespace_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<Json<ClearNamespaceResponse>> {
    let keys_deleted = state.store.clear_namespace(&namespace).await?;
    Ok(Json(ClearNamespaceResponse::new(namespace, keys_deleted)))
}

/// Handler for GET /stats
///
/// Returns global statistics, or a namespace-scoped snapshot with `?ns=`.
pub async fn stats_handler(
    State(state): State<AppState>,
    Query(query): Query<NsQuery>,
) -> Json<StatsSnapshot> {
    let namespace = resolve_namespace(query.ns, None);
    Json(state.store.stats(namespace.as_deref()).await)
}

/// Handler for GET /health
pub async fn health_handler(
    State(state): State<AppState>,
    Query(query): Query<NsQuery>,
) -> Json<HealthResponse> {
    let namespace = resolve_namespace(query.ns, None);
    let store_size = match namespace.as_deref() {
        Some(ns) => state.store.namespace_size(ns).await,
        None => state.store.len().await,
    };
    Json(HealthResponse::new(store_size, namespace))
}

/// Handler for POST /compact
///
/// Kicks off compaction in the background and returns immediately.
pub async fn compact_handler(State(state): State<AppState>) -> Json<CompactResponse> {
    let store = state.store.clone();
    tokio::spawn(async move {
        if let Err(err) = store.compact().await {
            warn!("Manual compaction failed: {}", err);
        }
    });
    Json(CompactResponse::started())
}

/// Handler for GET /performance
pub async fn performance_handler(State(state): State<AppState>) -> Json<PerfSummary> {
    Json(state.perf.summary().await)
}

/// Handler for GET /performance/recent-errors
pub async fn recent_errors_handler(State(state): State<AppState>) -> Json<Vec<PerfError>> {
    Json(state.perf.recent_errors(10).await)
}
