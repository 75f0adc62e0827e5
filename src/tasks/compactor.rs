//! WAL Compactor Task
//!
//! Background task that rewrites the write-ahead log once it grows past
//! the configured record threshold.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::KvStore;

/// Spawns a background task that periodically checks the WAL size and
/// compacts the log when it exceeds `max_log_size` records.
///
/// Compaction errors are logged and the task continues on its schedule.
///
/// # Arguments
/// * `store` - Shared store handle
/// * `compaction_interval_secs` - Interval in seconds between checks
/// * `max_log_size` - Record count above which compaction runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_compactor_task(
    store: Arc<KvStore>,
    compaction_interval_secs: u64,
    max_log_size: usize,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(compaction_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting compactor with interval of {} seconds (threshold {} records)",
            compaction_interval_secs, max_log_size
        );

        loop {
            tokio::time::sleep(interval).await;

            let log_size = store.log_size().await;
            if log_size <= max_log_size {
                debug!(
                    "Compaction check: log size {} within threshold {}",
                    log_size, max_log_size
                );
                continue;
            }

            info!(
                "Log size {} exceeds threshold {}, compacting",
                log_size, max_log_size
            );
            if let Err(err) = store.compact().await {
                warn!("Compaction failed: {}", err);
            }
        }
    })
}
