//! API Routes
//!
//! Configures the Axum router with all store server endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_namespace_handler, compact_handler, delete_handler, get_handler, health_handler,
    list_namespaces_handler, namespace_size_handler, performance_handler, recent_errors_handler,
    set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /set` - Store a key-value pair (optional `?ns=`)
/// - `GET /get/:key` - Retrieve a value by key (optional `?ns=`)
/// - `DELETE /delete/:key` - Delete a key (optional `?ns=`)
/// - `GET /namespaces` - List active namespaces
/// - `GET /namespaces/:namespace/keys` - Count keys in a namespace
/// - `DELETE /namespaces/:namespace` - Clear a namespace
/// - `GET /stats` - Store statistics (optional `?ns=`)
/// - `GET /health` - Health check (optional `?ns=`)
/// - `POST /compact` - Trigger WAL compaction
/// - `GET /performance` - Operation latency summary
/// - `GET /performance/recent-errors` - Recent failed operations
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/set", post(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/delete/:key", delete(delete_handler))
        .route("/namespaces", get(list_namespaces_handler))
        .route("/namespaces/:namespace/keys", get(namespace_size_handler))
        .route("/namespaces/:namespace", delete(clear_namespace_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/compact", post(compact_handler))
        .route("/performance", get(performance_handler))
        .route("/performance/recent-errors", get(recent_errors_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
