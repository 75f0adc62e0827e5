//! walcache - An in-memory key-value store over HTTP
//!
//! Provides bounded LRU storage with TTL expiration, namespace isolation,
//! and crash-recoverable persistence via a write-ahead log.

mod api;
mod config;
mod error;
mod models;
mod perf;
mod store;
mod tasks;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_router, AppState};
use config::Config;
use store::KvStore;
use tasks::{spawn_compactor_task, spawn_sweeper_task};

/// Main entry point for the walcache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the store, replaying the write-ahead log
/// 4. Start the background TTL sweeper and compactor
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "walcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting walcache server");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: store_capacity={}, log_file={}, compaction_interval={}s, max_log_size={}, cleanup_interval={}s, port={}",
        config.store_capacity,
        config.log_file.display(),
        config.compaction_interval,
        config.max_log_size,
        config.cleanup_interval,
        config.server_port
    );

    // Open the store, recovering state from the WAL
    let kv_store = match KvStore::open(&config).await {
        Ok(kv_store) => Arc::new(kv_store),
        Err(err) => {
            error!("Failed to open store: {}", err);
            std::process::exit(1);
        }
    };
    info!("Store initialized with {} keys", kv_store.len().await);

    // Start background tasks
    let sweeper_handle = spawn_sweeper_task(kv_store.clone(), config.cleanup_interval);
    let compactor_handle = spawn_compactor_task(
        kv_store.clone(),
        config.compaction_interval,
        config.max_log_size,
    );
    info!("Background tasks started");

    // Create router with all endpoints
    let state = AppState::new(kv_store);
    let app = create_router(state);

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {}: {}", addr, err);
            std::process::exit(1);
        }
    };
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(vec![sweeper_handle, compactor_handle]))
        .await
    {
        error!("Server error: {}", err);
    }

    info!("Server shutdown complete");
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful
/// shutdown.
async fn shutdown_signal(task_handles: Vec<tokio::task::JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Abort the background tasks
    for handle in task_handles {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
