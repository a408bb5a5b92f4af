//! In-process TTL caches for directory lookups

use dashmap::DashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// Cache names used as metric labels
pub mod names {
    pub const HANDLE_TO_ID: &str = "handle_to_id";
    pub const GROUP_MEMBERSHIP: &str = "group_membership";
}

/// Default TTLs
pub mod ttl {
    pub const DIRECTORY_SECS: u64 = 300; // 5 minutes
}

/// A cached value with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Concurrent cache with lazy expiry.
///
/// Entries older than the TTL are treated as absent on read and replaced on
/// the next insert. Nothing sweeps in the background; the key space is the
/// set of configured admin entries and groups, which stays small.
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Get a fresh value, if any
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.value.clone());

        let result = if hit.is_some() { "hit" } else { "miss" };
        metrics::counter!(
            "opsgate_cache_lookups_total",
            "cache" => self.name,
            "result" => result
        )
        .increment(1);

        hit
    }

    /// Insert or overwrite a value, stamping it with the current time
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
