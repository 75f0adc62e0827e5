//! Store Statistics Module
//!
//! Tracks global and per-namespace performance counters. Key counts are
//! always derived from the live map when a snapshot is taken, never kept
//! as running totals.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Display label used for the default (empty) namespace.
pub const DEFAULT_NAMESPACE_LABEL: &str = "default";

/// Maps a raw namespace string to its statistics label.
pub fn namespace_label(namespace: &str) -> &str {
    if namespace.is_empty() {
        DEFAULT_NAMESPACE_LABEL
    } else {
        namespace
    }
}

// == Namespace Counters ==
/// Hit/miss counters for one namespace. Created lazily on first reference
/// and retained for the life of the process, even when the namespace has
/// no live keys left.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceCounters {
    pub cache_hits: u64,
    pub cache_misses: u64,
}

// == Store Stats ==
/// Global counters plus the per-namespace table.
#[derive(Debug, Default)]
pub struct StoreStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    /// Records appended since the last compaction
    pub log_size: usize,
    pub last_compaction: Option<DateTime<Utc>>,
    namespaces: HashMap<String, NamespaceCounters>,
}

impl StoreStats {
    /// Creates a stats block with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a namespace has a counter slot.
    pub fn touch_namespace(&mut self, namespace: &str) {
        self.namespaces
            .entry(namespace_label(namespace).to_string())
            .or_default();
    }

    /// Records a hit, globally and for the namespace.
    pub fn record_hit(&mut self, namespace: &str) {
        self.cache_hits += 1;
        self.namespaces
            .entry(namespace_label(namespace).to_string())
            .or_default()
            .cache_hits += 1;
    }

    /// Records a miss, globally and for the namespace.
    pub fn record_miss(&mut self, namespace: &str) {
        self.cache_misses += 1;
        self.namespaces
            .entry(namespace_label(namespace).to_string())
            .or_default()
            .cache_misses += 1;
    }

    /// Records a capacity eviction.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Counters for one namespace, if it has ever been referenced.
    pub fn namespace(&self, namespace: &str) -> NamespaceCounters {
        self.namespaces
            .get(namespace_label(namespace))
            .copied()
            .unwrap_or_default()
    }

    /// The full per-namespace counter table, keyed by label.
    pub fn namespaces(&self) -> &HashMap<String, NamespaceCounters> {
        &self.namespaces
    }
}

// == Snapshot Views ==
/// Per-namespace statistics as reported to clients.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_keys: usize,
}

/// Point-in-time copy of the store counters.
///
/// When scoped to one namespace, `total_keys` counts that namespace and
/// `namespace`/`namespace_stats` are present instead of the full
/// `namespaces` table.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_keys: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub log_size: usize,
    pub last_compaction: Option<DateTime<Utc>>,
    pub uptime_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<BTreeMap<String, NamespaceSnapshot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_stats: Option<NamespaceSnapshot>,
}
