//! Performance Monitoring Module
//!
//! Collects per-operation timings from the API handlers into a bounded
//! ring buffer and summarizes them for the performance endpoints. Guarded
//! by its own mutex so it never contends with the store lock.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::Mutex;

/// How many samples the ring buffer retains.
const MAX_HISTORY: usize = 10_000;

// == Sample ==
#[derive(Debug, Clone)]
struct OperationSample {
    operation: &'static str,
    /// Wall-clock completion time, seconds since epoch
    timestamp: f64,
    duration: Duration,
    success: bool,
    error: Option<String>,
}

// == Monitor ==
/// Bounded collector of operation timings.
#[derive(Debug)]
pub struct PerfMonitor {
    inner: Mutex<PerfInner>,
}

#[derive(Debug)]
struct PerfInner {
    samples: VecDeque<OperationSample>,
    start_time: Instant,
}

impl PerfMonitor {
    /// Creates a monitor with an empty history.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PerfInner {
                samples: VecDeque::with_capacity(MAX_HISTORY),
                start_time: Instant::now(),
            }),
        }
    }

    // == Record ==
    /// Records one completed operation. The oldest sample is dropped once
    /// the history is full.
    pub async fn record(
        &self,
        operation: &'static str,
        duration: Duration,
        success: bool,
        error: Option<String>,
    ) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs_f64();

        let mut inner = self.inner.lock().await;
        if inner.samples.len() == MAX_HISTORY {
            inner.samples.pop_front();
        }
        inner.samples.push_back(OperationSample {
            operation,
            timestamp,
            duration,
            success,
            error,
        });
    }

    // == Summary ==
    /// Aggregate view over the retained samples.
    pub async fn summary(&self) -> PerfSummary {
        let inner = self.inner.lock().await;
        let uptime_seconds = inner.start_time.elapsed().as_secs_f64();

        if inner.samples.is_empty() {
            return PerfSummary {
                total_operations: 0,
                successful_operations: 0,
                operations_per_second: 0.0,
                error_rate: 0.0,
                avg_latency_ms: 0.0,
                p95_latency_ms: 0.0,
                p99_latency_ms: 0.0,
                operation_breakdown: BTreeMap::new(),
                uptime_seconds,
            };
        }

        let total = inner.samples.len();
        let successful = inner.samples.iter().filter(|s| s.success).count();

        let mut latencies_ms: Vec<f64> = inner
            .samples
            .iter()
            .map(|s| s.duration.as_secs_f64() * 1000.0)
            .collect();
        latencies_ms.sort_by(|a, b| a.total_cmp(b));

        let avg = latencies_ms.iter().sum::<f64>() / total as f64;
        let percentile = |p: f64| latencies_ms[((p * total as f64) as usize).min(total - 1)];

        let mut breakdown: BTreeMap<String, u64> = BTreeMap::new();
        for sample in &inner.samples {
            *breakdown.entry(sample.operation.to_string()).or_default() += 1;
        }

        let ops_per_second = if uptime_seconds > 0.0 {
            total as f64 / uptime_seconds
        } else {
            0.0
        };

        PerfSummary {
            total_operations: total,
            successful_operations: successful,
            operations_per_second: round2(ops_per_second),
            error_rate: round2((total - successful) as f64 / total as f64 * 100.0),
            avg_latency_ms: round2(avg),
            p95_latency_ms: round2(percentile(0.95)),
            p99_latency_ms: round2(percentile(0.99)),
            operation_breakdown: breakdown,
            uptime_seconds: round2(uptime_seconds),
        }
    }

    // == Recent Errors ==
    /// The most recent failed operations, newest first.
    pub async fn recent_errors(&self, limit: usize) -> Vec<PerfError> {
        let inner = self.inner.lock().await;
        inner
            .samples
            .iter()
            .rev()
            .filter(|s| !s.success)
            .take(limit)
            .map(|s| PerfError {
                operation: s.operation.to_string(),
                timestamp: s.timestamp,
                error: s.error.clone(),
                duration_ms: round2(s.duration.as_secs_f64() * 1000.0),
            })
            .collect()
    }
}

impl Default for PerfMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// == Response Views ==
/// Summary reported by `GET /performance`.
#[derive(Debug, Clone, Serialize)]
pub struct PerfSummary {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub operations_per_second: f64,
    /// Percentage of operations that failed
    pub error_rate: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub operation_breakdown: BTreeMap<String, u64>,
    pub uptime_seconds: f64,
}

/// One failed operation, as reported by `GET /performance/recent-errors`.
#[derive(Debug, Clone, Serialize)]
pub struct PerfError {
    pub operation: String,
    pub timestamp: f64,
    pub error: Option<String>,
    pub duration_ms: f64,
}
