//! Store Module
//!
//! The store core: a namespace-aware LRU map with TTL expiration, coupled
//! to a write-ahead log for crash recovery.

mod lru;
mod stats;
mod store;
pub(crate) mod wal;


// Re-export public types
pub use lru::{Lookup, LruMap, QualifiedKey};
pub use stats::{
    namespace_label, NamespaceCounters, NamespaceSnapshot, StatsSnapshot, StoreStats,
    DEFAULT_NAMESPACE_LABEL,
};
pub use store::KvStore;
pub use wal::{Wal, WalAction, WalRecord};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
