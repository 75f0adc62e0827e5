//! LRU Map Module
//!
//! Namespace-aware mapping of qualified keys to entries with recency order.
//! Backed by a HashMap index into an arena of list nodes, so touch, insert,
//! delete, and eviction are all O(1).

use std::collections::HashMap;
use std::time::Instant;

// == Qualified Key ==
/// A key qualified by its namespace.
///
/// The empty namespace is the default. Two entries with the same key but
/// different namespaces are fully independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedKey {
    /// Namespace, empty string for the default namespace
    pub namespace: String,
    /// The key within the namespace
    pub key: String,
}

impl QualifiedKey {
    /// Creates a qualified key. An empty namespace means the default.
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

// == Lookup Result ==
/// Outcome of a map lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Entry is present and live; recency was updated.
    Hit(String),
    /// Entry is present but its expiry has passed; recency was NOT updated.
    /// The caller is expected to remove the entry.
    Expired,
    /// No entry for this qualified key.
    Miss,
}

// == Arena Node ==
/// A recency-list node. `prev`/`next` are arena indices, never references;
/// the arena owns all node storage and freed slots are reused.
#[derive(Debug)]
struct Node {
    qk: QualifiedKey,
    value: String,
    expires_at: Option<Instant>,
    prev: usize,
    next: usize,
}

/// Arena index of the head sentinel (most recently used side).
const HEAD: usize = 0;
/// Arena index of the tail sentinel (eviction candidate side).
const TAIL: usize = 1;

// == LRU Map ==
/// Bounded map from qualified key to entry with LRU recency ordering.
#[derive(Debug)]
pub struct LruMap {
    /// Node arena; slots 0 and 1 are the head/tail sentinels
    slots: Vec<Node>,
    /// Freed slot indices available for reuse
    free: Vec<usize>,
    /// Qualified key -> arena index of its node
    index: HashMap<QualifiedKey, usize>,
    /// Maximum number of live entries
    capacity: usize,
}

impl LruMap {
    // == Constructor ==
    /// Creates an empty map with the given capacity.
    ///
    /// Capacity 0 is allowed and disables storage entirely: every `put`
    /// reports the inserted pair as evicted.
    pub fn new(capacity: usize) -> Self {
        let sentinel = |prev, next| Node {
            qk: QualifiedKey::new("", ""),
            value: String::new(),
            expires_at: None,
            prev,
            next,
        };
        Self {
            slots: vec![sentinel(HEAD, TAIL), sentinel(HEAD, TAIL)],
            free: Vec::new(),
            index: HashMap::new(),
            capacity,
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Get ==
    /// Looks up a qualified key.
    ///
    /// A live entry is moved to the head of the recency list. An expired
    /// entry is reported without promotion; the caller removes it.
    pub fn get(&mut self, qk: &QualifiedKey, now: Instant) -> Lookup {
        let idx = match self.index.get(qk) {
            Some(&idx) => idx,
            None => return Lookup::Miss,
        };

        if let Some(expires_at) = self.slots[idx].expires_at {
            if expires_at <= now {
                return Lookup::Expired;
            }
        }

        self.unlink(idx);
        self.push_front(idx);
        Lookup::Hit(self.slots[idx].value.clone())
    }

    // == Put ==
    /// Inserts or updates an entry, returning any pair evicted to make room.
    ///
    /// Updating an existing key never evicts, even if the new expiry is
    /// already in the past; expiry is enforced on read.
    pub fn put(
        &mut self,
        qk: QualifiedKey,
        value: String,
        expires_at: Option<Instant>,
    ) -> Option<(QualifiedKey, String)> {
        if let Some(&idx) = self.index.get(&qk) {
            let node = &mut self.slots[idx];
            node.value = value;
            node.expires_at = expires_at;
            self.unlink(idx);
            self.push_front(idx);
            return None;
        }

        if self.capacity == 0 {
            return Some((qk, value));
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict_tail()
        } else {
            None
        };

        self.insert_front(qk, value, expires_at);
        evicted
    }

    // == Delete ==
    /// Removes an entry. Returns whether the key existed.
    pub fn delete(&mut self, qk: &QualifiedKey) -> bool {
        match self.index.remove(qk) {
            Some(idx) => {
                self.unlink(idx);
                self.free_slot(idx);
                true
            }
            None => false,
        }
    }

    // == Eviction ==
    /// Unlinks and removes the least recently used entry.
    pub fn evict_tail(&mut self) -> Option<(QualifiedKey, String)> {
        let idx = self.slots[TAIL].prev;
        if idx == HEAD {
            return None;
        }
        self.unlink(idx);
        let qk = std::mem::replace(&mut self.slots[idx].qk, QualifiedKey::new("", ""));
        let value = std::mem::take(&mut self.slots[idx].value);
        self.index.remove(&qk);
        self.slots[idx].expires_at = None;
        self.free.push(idx);
        Some((qk, value))
    }

    // == Recovery Helpers ==
    /// Inserts without enforcing capacity. Used only during WAL replay,
    /// where the map may momentarily exceed capacity; callers must finish
    /// with [`trim_to_capacity`](Self::trim_to_capacity).
    pub fn insert_unchecked(
        &mut self,
        qk: QualifiedKey,
        value: String,
        expires_at: Option<Instant>,
    ) {
        if let Some(&idx) = self.index.get(&qk) {
            let node = &mut self.slots[idx];
            node.value = value;
            node.expires_at = expires_at;
            self.unlink(idx);
            self.push_front(idx);
        } else {
            self.insert_front(qk, value, expires_at);
        }
    }

    /// Evicts from the tail until size fits the capacity. Returns how many
    /// entries were removed.
    pub fn trim_to_capacity(&mut self) -> usize {
        let mut trimmed = 0;
        while self.index.len() > self.capacity {
            if self.evict_tail().is_none() {
                break;
            }
            trimmed += 1;
        }
        trimmed
    }

    // == Scans ==
    /// Qualified keys whose expiry is at or before `now`. Full scan; used
    /// only by the sweeper.
    pub fn expired_keys(&self, now: Instant) -> Vec<QualifiedKey> {
        self.index
            .iter()
            .filter(|(_, idx)| matches!(self.slots[**idx].expires_at, Some(at) if at <= now))
            .map(|(qk, _)| qk.clone())
            .collect()
    }

    /// Live (non-expired) entries with their expiry instants, in no
    /// particular order. Does not touch recency; used by compaction.
    pub fn live_entries(&self, now: Instant) -> Vec<(QualifiedKey, String, Option<Instant>)> {
        self.index
            .values()
            .filter_map(|&idx| {
                let node = &self.slots[idx];
                match node.expires_at {
                    Some(at) if at <= now => None,
                    _ => Some((node.qk.clone(), node.value.clone(), node.expires_at)),
                }
            })
            .collect()
    }

    /// Qualified keys belonging to a namespace.
    pub fn keys_in_namespace(&self, namespace: &str) -> Vec<QualifiedKey> {
        self.index
            .keys()
            .filter(|qk| qk.namespace == namespace)
            .cloned()
            .collect()
    }

    /// Number of entries whose namespace matches.
    pub fn namespace_size(&self, namespace: &str) -> usize {
        self.index
            .keys()
            .filter(|qk| qk.namespace == namespace)
            .count()
    }

    /// Distinct namespace strings currently holding at least one entry.
    /// The default namespace appears as the empty string.
    pub fn namespaces(&self) -> Vec<String> {
        let mut seen: Vec<String> = self
            .index
            .keys()
            .map(|qk| qk.namespace.clone())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        seen.sort();
        seen
    }

    // == Consistency Check ==
    /// Walks the recency list and cross-checks it against the index,
    /// returning a description of the first mismatch found. Full scan;
    /// run by the sweeper, never on the request path.
    pub fn check_consistency(&self) -> Result<(), String> {
        let mut seen = 0usize;
        let mut prev = HEAD;
        let mut idx = self.slots[HEAD].next;
        while idx != TAIL {
            if seen >= self.index.len() {
                return Err(format!(
                    "recency list holds more than the {} indexed entries",
                    self.index.len()
                ));
            }
            let node = &self.slots[idx];
            if node.prev != prev {
                return Err(format!("broken prev link at entry for key '{}'", node.qk.key));
            }
            match self.index.get(&node.qk) {
                Some(&mapped) if mapped == idx => {}
                Some(_) => {
                    return Err(format!(
                        "index maps key '{}' to a different node",
                        node.qk.key
                    ));
                }
                None => {
                    return Err(format!(
                        "linked entry for key '{}' is missing from the index",
                        node.qk.key
                    ));
                }
            }
            seen += 1;
            prev = idx;
            idx = node.next;
        }
        if seen != self.index.len() {
            return Err(format!(
                "recency list holds {} entries but the index holds {}",
                seen,
                self.index.len()
            ));
        }
        Ok(())
    }

    // == List Internals ==
    fn insert_front(&mut self, qk: QualifiedKey, value: String, expires_at: Option<Instant>) {
        let node = Node {
            qk: qk.clone(),
            value,
            expires_at,
            prev: HEAD,
            next: HEAD,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = node;
                idx
            }
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            }
        };
        self.push_front(idx);
        self.index.insert(qk, idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        self.slots[prev].next = next;
        self.slots[next].prev = prev;
    }

    fn push_front(&mut self, idx: usize) {
        let first = self.slots[HEAD].next;
        self.slots[idx].prev = HEAD;
        self.slots[idx].next = first;
        self.slots[first].prev = idx;
        self.slots[HEAD].next = idx;
    }

    fn free_slot(&mut self, idx: usize) {
        self.slots[idx].qk = QualifiedKey::new("", "");
        self.slots[idx].value = String::new();
        self.slots[idx].expires_at = None;
        self.free.push(idx);
    }
}
