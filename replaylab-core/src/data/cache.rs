//! Process-wide bounded-cost cache.
//!
//! Every entry carries an approximate cost; the sum of costs never exceeds the
//! configured budget. When an insert would overflow, the least recently used
//! entries are evicted until it fits. In live mode every entry also expires
//! after a short TTL so freshly appended data is re-observed.

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default budget: 512 MiB.
pub const DEFAULT_MAX_COST: u64 = 1 << 29;

/// Heuristic cost of one decoded payload.
pub const PAYLOAD_COST: u64 = 1 << 19;

/// Cost of a confirmed-absent marker.
pub const ABSENT_COST: u64 = 1;

/// Expiry applied to every entry in live mode.
pub const LIVE_TTL: Duration = Duration::from_secs(1);

/// Whether cached data may change underneath us.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Closed historical window: entries never expire.
    #[default]
    Historical,
    /// Live data: entries expire after [`LIVE_TTL`].
    Live,
}

impl CacheMode {
    pub fn ttl(self) -> Option<Duration> {
        match self {
            CacheMode::Historical => None,
            CacheMode::Live => Some(LIVE_TTL),
        }
    }
}

/// A stored value and the cost it was admitted with.
#[derive(Clone)]
struct Weighted<V> {
    value: V,
    cost: u32,
}

/// Cost-bounded cache over `moka`, evicting least recently used entries.
///
/// Maintenance runs after every write, so [`cost`](Self::cost) is within the
/// budget whenever an insert returns.
pub struct CostCache<V> {
    max_cost: u64,
    inner: Cache<String, Weighted<V>>,
}

impl<V: Clone + Send + Sync + 'static> CostCache<V> {
    pub fn new(max_cost: u64, mode: CacheMode) -> Self {
        Self::with_ttl(max_cost, mode.ttl())
    }

    pub fn with_ttl(max_cost: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(max_cost)
            .eviction_policy(EvictionPolicy::lru())
            .weigher(|_key: &String, entry: &Weighted<V>| entry.cost);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        Self {
            max_cost,
            inner: builder.build(),
        }
    }

    /// Look up `key`. Expired entries read as misses.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value)
    }

    /// Store `value` under `key`, evicting as needed.
    ///
    /// Returns false when the entry alone exceeds the whole budget; it is then
    /// not stored, and any previous value under `key` is dropped.
    pub fn insert(&self, key: impl Into<String>, value: V, cost: u64) -> bool {
        let key = key.into();
        let cost = match u32::try_from(cost) {
            Ok(c) if u64::from(c) <= self.max_cost => c,
            _ => {
                self.inner.invalidate(&key);
                self.inner.run_pending_tasks();
                return false;
            }
        };
        self.inner.insert(key, Weighted { value, cost });
        self.inner.run_pending_tasks();
        true
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        let removed = self.inner.remove(key).map(|entry| entry.value);
        self.inner.run_pending_tasks();
        removed
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.run_pending_tasks();
        usize::try_from(self.inner.entry_count()).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the costs of stored entries.
    pub fn cost(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.weighted_size()
    }

    pub fn max_cost(&self) -> u64 {
        self.max_cost
    }
}
