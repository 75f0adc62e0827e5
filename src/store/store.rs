//! Store Engine Module
//!
//! Orchestrates the LRU map and the write-ahead log under a single async
//! mutex and exposes the public operation set. Every mutating operation
//! appends its WAL record before the in-memory state changes; a failed
//! append leaves memory untouched.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::store::wal::{self, Wal, WalAction, WalRecord};
use crate::store::{
    namespace_label, Lookup, LruMap, NamespaceSnapshot, QualifiedKey, StatsSnapshot, StoreStats,
    MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};

// == Store ==
/// Key-value store with LRU eviction, TTL expiration, namespace isolation,
/// and WAL persistence.
///
/// All state lives behind one async mutex; handlers and background tasks
/// serialize through it, and WAL record order equals that serialization
/// order.
#[derive(Debug)]
pub struct KvStore {
    inner: Mutex<StoreInner>,
    log_file: PathBuf,
    start_time: Instant,
}

#[derive(Debug)]
struct StoreInner {
    lru: LruMap,
    wal: Wal,
    stats: StoreStats,
}

impl KvStore {
    // == Open & Recovery ==
    /// Opens the store, replaying any existing WAL.
    ///
    /// Replay applies records in append order, re-evaluating TTLs against
    /// the current clock and ignoring capacity; once replay completes the
    /// map is trimmed from the recency tail, so the most recently written
    /// keys survive.
    pub async fn open(config: &Config) -> Result<Self> {
        if let Some(parent) = config.log_file.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let records = wal::replay(&config.log_file).await?;
        let mut lru = LruMap::new(config.store_capacity);
        let wall_now = wal::epoch_seconds();
        let now = Instant::now();

        for record in &records {
            let qk = record.qualified_key();
            match record.action {
                WalAction::Set => {
                    let value = match &record.value {
                        Some(value) => value.clone(),
                        None => {
                            warn!("Skipping SET record without a value for key '{}'", qk.key);
                            continue;
                        }
                    };
                    let expires_at = match record.ttl {
                        Some(ttl) => {
                            let remaining = record.timestamp + ttl as f64 - wall_now;
                            if remaining <= 0.0 {
                                continue;
                            }
                            Some(now + Duration::from_secs_f64(remaining))
                        }
                        None => None,
                    };
                    lru.insert_unchecked(qk, value, expires_at);
                }
                WalAction::Delete => {
                    lru.delete(&qk);
                }
            }
        }

        let trimmed = lru.trim_to_capacity();
        if !records.is_empty() {
            info!(
                "Recovered {} WAL records: {} live keys ({} trimmed to capacity)",
                records.len(),
                lru.len(),
                trimmed
            );
        }

        let wal = Wal::open(&config.log_file).await?;
        let mut stats = StoreStats::new();
        stats.log_size = records.len();

        Ok(Self {
            inner: Mutex::new(StoreInner { lru, wal, stats }),
            log_file: config.log_file.clone(),
            start_time: Instant::now(),
        })
    }

    // == Set ==
    /// Stores a value under (namespace, key) with an optional TTL.
    ///
    /// Validation happens before the mutex is acquired. The WAL append
    /// precedes the map mutation; eviction of the LRU tail is counted in
    /// the statistics.
    pub async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Option<u64>,
    ) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::Validation("Key cannot be empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(StoreError::Validation(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(StoreError::Validation(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }
        if ttl == Some(0) {
            return Err(StoreError::Validation(
                "TTL must be a positive number of seconds".to_string(),
            ));
        }

        let qk = QualifiedKey::new(namespace, key);
        let record = WalRecord::set(&qk, &value, ttl);
        let expires_at = ttl.map(|secs| Instant::now() + Duration::from_secs(secs));

        let mut inner = self.inner.lock().await;
        inner.wal.append(&record).await?;
        if let Some((evicted, _)) = inner.lru.put(qk, value, expires_at) {
            inner.stats.record_eviction();
            debug!(
                "Evicted least recently used key '{}' (namespace '{}')",
                evicted.key,
                namespace_label(&evicted.namespace)
            );
        }
        inner.stats.log_size += 1;
        inner.stats.touch_namespace(namespace);
        Ok(())
    }

    // == Get ==
    /// Retrieves a value, counting the hit or miss globally and for the
    /// namespace. An expired entry is removed before returning and counts
    /// as a miss; no WAL record is written for it.
    pub async fn get(&self, namespace: &str, key: &str) -> Option<String> {
        let qk = QualifiedKey::new(namespace, key);

        let mut inner = self.inner.lock().await;
        match inner.lru.get(&qk, Instant::now()) {
            Lookup::Hit(value) => {
                inner.stats.record_hit(namespace);
                Some(value)
            }
            Lookup::Expired => {
                inner.lru.delete(&qk);
                inner.stats.record_miss(namespace);
                None
            }
            Lookup::Miss => {
                inner.stats.record_miss(namespace);
                None
            }
        }
    }

    // == Delete ==
    /// Deletes a key, returning whether it existed.
    ///
    /// The DELETE record is appended unconditionally, even when the key is
    /// absent; replaying the record stream then reproduces the in-memory
    /// state exactly. `log_size` only counts deletes that removed a key.
    pub async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        let qk = QualifiedKey::new(namespace, key);
        let record = WalRecord::delete(&qk);

        let mut inner = self.inner.lock().await;
        inner.wal.append(&record).await?;
        let existed = inner.lru.delete(&qk);
        if existed {
            inner.stats.log_size += 1;
        }
        Ok(existed)
    }

    // == Namespace Operations ==
    /// Sorted labels of namespaces holding at least one live entry. The
    /// default namespace appears under its label when it has entries.
    pub async fn list_namespaces(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut labels: Vec<String> = inner
            .lru
            .namespaces()
            .iter()
            .map(|ns| namespace_label(ns).to_string())
            .collect();
        labels.sort();
        labels
    }

    /// Number of entries in a namespace.
    pub async fn namespace_size(&self, namespace: &str) -> usize {
        let inner = self.inner.lock().await;
        inner.lru.namespace_size(namespace)
    }

    /// Removes every entry in a namespace, appending one DELETE record per
    /// key before its removal. Returns how many keys were deleted.
    pub async fn clear_namespace(&self, namespace: &str) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let keys = inner.lru.keys_in_namespace(namespace);
        let mut removed = 0;
        for qk in keys {
            inner.wal.append(&WalRecord::delete(&qk)).await?;
            if inner.lru.delete(&qk) {
                removed += 1;
                inner.stats.log_size += 1;
            }
        }
        Ok(removed)
    }

    // == Stats ==
    /// Snapshot of the statistics counters. With a namespace argument the
    /// snapshot is scoped: `total_keys` counts that namespace and the
    /// per-namespace table is replaced by a focused block.
    pub async fn stats(&self, namespace: Option<&str>) -> StatsSnapshot {
        let inner = self.inner.lock().await;
        let uptime_seconds = self.start_time.elapsed().as_secs_f64();

        let base = StatsSnapshot {
            total_keys: inner.lru.len(),
            cache_hits: inner.stats.cache_hits,
            cache_misses: inner.stats.cache_misses,
            evictions: inner.stats.evictions,
            log_size: inner.stats.log_size,
            last_compaction: inner.stats.last_compaction,
            uptime_seconds,
            namespaces: None,
            namespace: None,
            namespace_stats: None,
        };

        match namespace {
            Some(ns) => {
                let counters = inner.stats.namespace(ns);
                let total_keys = inner.lru.namespace_size(ns);
                StatsSnapshot {
                    total_keys,
                    namespace: Some(ns.to_string()),
                    namespace_stats: Some(NamespaceSnapshot {
                        cache_hits: counters.cache_hits,
                        cache_misses: counters.cache_misses,
                        total_keys,
                    }),
                    ..base
                }
            }
            None => {
                let table: BTreeMap<String, NamespaceSnapshot> = inner
                    .stats
                    .namespaces()
                    .iter()
                    .map(|(label, counters)| {
                        let raw = if label == crate::store::DEFAULT_NAMESPACE_LABEL {
                            ""
                        } else {
                            label.as_str()
                        };
                        (
                            label.clone(),
                            NamespaceSnapshot {
                                cache_hits: counters.cache_hits,
                                cache_misses: counters.cache_misses,
                                total_keys: inner.lru.namespace_size(raw),
                            },
                        )
                    })
                    .collect();
                StatsSnapshot {
                    namespaces: Some(table),
                    ..base
                }
            }
        }
    }

    // == Compaction ==
    /// Rewrites the WAL to one SET record per live, non-expired entry.
    ///
    /// The mutex is held only to snapshot the live entries and, after the
    /// temp-file write and atomic rename, to swap the append handle and
    /// stamp the counters. Records appended during the I/O window stay in
    /// memory and are re-emitted by the next compaction.
    pub async fn compact(&self) -> Result<()> {
        let records: Vec<WalRecord> = {
            let inner = self.inner.lock().await;
            let now = Instant::now();
            inner
                .lru
                .live_entries(now)
                .into_iter()
                .filter_map(|(qk, value, expires_at)| {
                    let ttl = match expires_at {
                        Some(at) => {
                            let remaining = at.saturating_duration_since(now).as_secs();
                            if remaining == 0 {
                                // Log TTLs are positive integers; an entry
                                // with under a second left is dropped.
                                return None;
                            }
                            Some(remaining)
                        }
                        None => None,
                    };
                    Some(WalRecord::set(&qk, &value, ttl))
                })
                .collect()
        };

        wal::write_compacted(&self.log_file, &records).await?;

        let mut inner = self.inner.lock().await;
        inner.wal.reopen().await?;
        inner.stats.log_size = records.len();
        inner.stats.last_compaction = Some(Utc::now());
        info!("Log compaction completed: {} live records", records.len());
        Ok(())
    }

    // == Expiration Sweep ==
    /// Physically removes every expired entry. No WAL records are written;
    /// recovery replays the original SETs and re-evaluates their TTLs.
    ///
    /// Each sweep also cross-checks the recency list against the key index.
    /// A mismatch is logged as an internal error and the store continues in
    /// a degraded state; it is never surfaced to a caller.
    pub async fn sweep_expired(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let expired = inner.lru.expired_keys(now);
        let count = expired.len();
        for qk in &expired {
            inner.lru.delete(qk);
        }

        if let Err(detail) = inner.lru.check_consistency() {
            let err = StoreError::Internal(detail);
            error!("Store invariant violated: {}", err);
        }

        count
    }

    // == Size ==
    /// Number of entries currently in the store.
    pub async fn len(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.lru.len()
    }

    /// Records appended since the last compaction. Used by the compactor
    /// to decide whether the threshold has been crossed.
    pub async fn log_size(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.stats.log_size
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::{sleep, Duration};

    fn test_config(dir: &TempDir, capacity: usize) -> Config {
        Config {
            store_capacity: capacity,
            log_file: dir.path().join("wal.log"),
            ..Config::default()
        }
    }

    async fn wal_lines(config: &Config) -> Vec<serde_json::Value> {
        let text = tokio::fs::read_to_string(&config.log_file).await.unwrap();
        text.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_basic_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::open(&test_config(&dir, 100)).await.unwrap();

        store.set("", "a", "1".to_string(), None).await.unwrap();
        assert_eq!(store.get("", "a").await, Some("1".to_string()));

        assert!(store.delete("", "a").await.unwrap());
        assert_eq!(store.get("", "a").await, None);
    }

    #[tokio::test]
    async fn test_set_validation() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::open(&test_config(&dir, 100)).await.unwrap();

        let empty_key = store.set("", "", "v".to_string(), None).await;
        assert!(matches!(empty_key, Err(StoreError::Validation(_))));

        let zero_ttl = store.set("", "k", "v".to_string(), Some(0)).await;
        assert!(matches!(zero_ttl, Err(StoreError::Validation(_))));

        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);
        let too_long = store.set("", &long_key, "v".to_string(), None).await;
        assert!(matches!(too_long, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::open(&test_config(&dir, 100)).await.unwrap();

        store.set("", "k", "v".to_string(), Some(1)).await.unwrap();
        assert_eq!(store.get("", "k").await, Some("v".to_string()));

        sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.get("", "k").await, None);

        // The expired entry was removed and counted as a miss.
        let stats = store.stats(None).await;
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.total_keys, 0);
    }

    #[tokio::test]
    async fn test_eviction_under_capacity() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::open(&test_config(&dir, 2)).await.unwrap();

        store.set("", "a", "1".to_string(), None).await.unwrap();
        store.set("", "b", "2".to_string(), None).await.unwrap();
        store.get("", "a").await;
        store.set("", "c", "3".to_string(), None).await.unwrap();

        assert_eq!(store.get("", "a").await, Some("1".to_string()));
        assert_eq!(store.get("", "b").await, None);
        assert_eq!(store.get("", "c").await, Some("3".to_string()));

        let stats = store.stats(None).await;
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.total_keys, 2);
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::open(&test_config(&dir, 100)).await.unwrap();

        store.set("t1", "k", "A".to_string(), None).await.unwrap();
        store.set("t2", "k", "B".to_string(), None).await.unwrap();

        assert_eq!(store.get("t1", "k").await, Some("A".to_string()));
        assert_eq!(store.get("t2", "k").await, Some("B".to_string()));
        assert_eq!(store.namespace_size("t1").await, 1);

        let namespaces = store.list_namespaces().await;
        assert_eq!(namespaces, vec!["t1".to_string(), "t2".to_string()]);
    }

    #[tokio::test]
    async fn test_default_namespace_listed_when_populated() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::open(&test_config(&dir, 100)).await.unwrap();

        store.set("", "k", "v".to_string(), None).await.unwrap();
        store.set("t1", "k", "v".to_string(), None).await.unwrap();

        let namespaces = store.list_namespaces().await;
        assert_eq!(namespaces, vec!["default".to_string(), "t1".to_string()]);
    }

    #[tokio::test]
    async fn test_recovery_replays_log() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 100);

        {
            let store = KvStore::open(&config).await.unwrap();
            store.set("", "x", "1".to_string(), None).await.unwrap();
            store.set("", "y", "2".to_string(), None).await.unwrap();
            store.delete("", "x").await.unwrap();
        }

        let store = KvStore::open(&config).await.unwrap();
        assert_eq!(store.get("", "x").await, None);
        assert_eq!(store.get("", "y").await, Some("2".to_string()));
        assert_eq!(store.stats(None).await.total_keys, 1);
    }

    #[tokio::test]
    async fn test_recovery_trims_to_capacity_from_tail() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 100);

        {
            let store = KvStore::open(&config).await.unwrap();
            for i in 0..5 {
                store
                    .set("", &format!("k{}", i), i.to_string(), None)
                    .await
                    .unwrap();
            }
        }

        // Reopen with a smaller capacity: the earliest replayed keys give way.
        let small = Config {
            store_capacity: 2,
            ..config
        };
        let store = KvStore::open(&small).await.unwrap();
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("", "k0").await, None);
        assert_eq!(store.get("", "k3").await, Some("3".to_string()));
        assert_eq!(store.get("", "k4").await, Some("4".to_string()));
    }

    #[tokio::test]
    async fn test_recovery_skips_expired_sets() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 100);

        // A SET whose TTL elapsed long before recovery.
        let stale = serde_json::json!({
            "timestamp": wal::epoch_seconds() - 10.0,
            "action": "SET",
            "key": "gone",
            "value": "v",
            "ttl": 1
        });
        let live = serde_json::json!({
            "timestamp": wal::epoch_seconds(),
            "action": "SET",
            "key": "here",
            "value": "v",
            "ttl": 3600
        });
        tokio::fs::write(
            &config.log_file,
            format!("{}\n{}\n", stale, live),
        )
        .await
        .unwrap();

        let store = KvStore::open(&config).await.unwrap();
        assert_eq!(store.get("", "gone").await, None);
        assert_eq!(store.get("", "here").await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_delete_absent_appends_record() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 100);
        let store = KvStore::open(&config).await.unwrap();

        assert!(!store.delete("", "ghost").await.unwrap());

        let lines = wal_lines(&config).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["action"], "DELETE");
        assert_eq!(lines[0]["key"], "ghost");

        // Absent deletes do not advance log_size.
        assert_eq!(store.log_size().await, 0);
    }

    #[tokio::test]
    async fn test_clear_namespace_logs_each_key() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 100);
        let store = KvStore::open(&config).await.unwrap();

        store.set("t1", "a", "1".to_string(), None).await.unwrap();
        store.set("t1", "b", "2".to_string(), None).await.unwrap();
        store.set("t2", "c", "3".to_string(), None).await.unwrap();

        assert_eq!(store.clear_namespace("t1").await.unwrap(), 2);
        assert_eq!(store.namespace_size("t1").await, 0);
        assert_eq!(store.namespace_size("t2").await, 1);

        let deletes = wal_lines(&config)
            .await
            .into_iter()
            .filter(|line| line["action"] == "DELETE")
            .count();
        assert_eq!(deletes, 2);
    }

    #[tokio::test]
    async fn test_compaction_preserves_semantics() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 100);

        {
            let store = KvStore::open(&config).await.unwrap();
            store.set("", "x", "1".to_string(), None).await.unwrap();
            store.set("", "y", "2".to_string(), None).await.unwrap();
            store.delete("", "x").await.unwrap();
        }

        let store = KvStore::open(&config).await.unwrap();
        store.compact().await.unwrap();

        // Exactly one live record remains, and reads are unchanged.
        let lines = wal_lines(&config).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["action"], "SET");
        assert_eq!(lines[0]["key"], "y");
        assert_eq!(store.get("", "y").await, Some("2".to_string()));
        assert_eq!(store.log_size().await, 1);

        let stats = store.stats(None).await;
        assert!(stats.last_compaction.is_some());
    }

    #[tokio::test]
    async fn test_compaction_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 100);
        let store = KvStore::open(&config).await.unwrap();

        store.set("", "a", "1".to_string(), None).await.unwrap();
        store.set("ns", "b", "2".to_string(), None).await.unwrap();

        store.compact().await.unwrap();
        let first: Vec<(String, String)> = wal_lines(&config)
            .await
            .iter()
            .map(|l| (l["key"].to_string(), l["value"].to_string()))
            .collect();

        store.compact().await.unwrap();
        let second: Vec<(String, String)> = wal_lines(&config)
            .await
            .iter()
            .map(|l| (l["key"].to_string(), l["value"].to_string()))
            .collect();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_appends_after_compaction_survive_recovery() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 100);

        {
            let store = KvStore::open(&config).await.unwrap();
            store.set("", "a", "1".to_string(), None).await.unwrap();
            store.compact().await.unwrap();
            store.set("", "b", "2".to_string(), None).await.unwrap();
        }

        let store = KvStore::open(&config).await.unwrap();
        assert_eq!(store.get("", "a").await, Some("1".to_string()));
        assert_eq!(store.get("", "b").await, Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_without_wal_records() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 100);
        let store = KvStore::open(&config).await.unwrap();

        store.set("", "dies", "v".to_string(), Some(1)).await.unwrap();
        store.set("", "lives", "v".to_string(), None).await.unwrap();

        sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.len().await, 1);

        // The sweep itself writes nothing to the log.
        let deletes = wal_lines(&config)
            .await
            .into_iter()
            .filter(|line| line["action"] == "DELETE")
            .count();
        assert_eq!(deletes, 0);
    }

    #[tokio::test]
    async fn test_stats_scoped_to_namespace() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::open(&test_config(&dir, 100)).await.unwrap();

        store.set("t1", "a", "1".to_string(), None).await.unwrap();
        store.get("t1", "a").await;
        store.get("t1", "missing").await;
        store.get("t2", "missing").await;

        let scoped = store.stats(Some("t1")).await;
        assert_eq!(scoped.namespace.as_deref(), Some("t1"));
        assert_eq!(scoped.total_keys, 1);
        let ns_stats = scoped.namespace_stats.unwrap();
        assert_eq!(ns_stats.cache_hits, 1);
        assert_eq!(ns_stats.cache_misses, 1);
        assert!(scoped.namespaces.is_none());

        let global = store.stats(None).await;
        assert_eq!(global.cache_hits, 1);
        assert_eq!(global.cache_misses, 2);
        let table = global.namespaces.unwrap();
        assert!(table.contains_key("t1"));
        assert!(table.contains_key("t2"));
    }
}
