use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::config::CacheSettings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub load_failures: u64,
}

impl CacheStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    load_failures: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.evictions.fetch_add(count, Ordering::Relaxed);
        }
    }

    fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct Stored<V> {
    value: V,
    written_at: Instant,
}

/// One key's storage. The cell is filled at most once; an expired slot is
/// replaced in the map, never reset.
#[derive(Debug)]
struct Slot<V> {
    cell: OnceCell<Stored<V>>,
}

impl<V> Slot<V> {
    fn empty() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    fn filled(value: V) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Stored {
                value,
                written_at: Instant::now(),
            })),
        }
    }

    fn written_at(&self) -> Option<Instant> {
        self.cell.get().map(|stored| stored.written_at)
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.written_at()
            .map_or(false, |written_at| written_at.elapsed() >= ttl)
    }
}

/// Size- and age-bounded in-memory cache with single-flight loading.
///
/// Concurrent [`get_with`](Self::get_with) calls for the same missing key
/// share one loader run; other keys load independently. Entries expire
/// `ttl` after they were written and are evicted lazily on access or by
/// [`cleanup`](Self::cleanup). When the entry count exceeds the bound, the
/// oldest-written entries go first.
#[derive(Debug)]
pub struct BoundedCache<K, V>
where
    K: Eq + Hash,
{
    name: &'static str,
    entries: DashMap<K, Arc<Slot<V>>>,
    max_entries: usize,
    ttl: Duration,
    stats: CacheStats,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, max_entries: usize, ttl: Duration) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            ttl,
            stats: CacheStats::default(),
        }
    }

    pub fn from_settings(name: &'static str, settings: &CacheSettings) -> Self {
        Self::new(name, settings.max_entries, settings.ttl())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value or runs `loader` to produce it.
    pub async fn get_with<F>(&self, key: K, loader: F) -> V
    where
        F: Future<Output = V>,
    {
        let slot = self.slot_for(&key);
        let mut loaded = false;
        let value = slot
            .cell
            .get_or_init(|| {
                loaded = true;
                async move {
                    Stored {
                        value: loader.await,
                        written_at: Instant::now(),
                    }
                }
            })
            .await
            .value
            .clone();
        self.after_lookup(loaded);
        value
    }

    /// Like [`get_with`](Self::get_with) for fallible loaders. An error is
    /// returned to the caller that ran the loader and nothing is cached;
    /// a waiting caller then runs its own loader.
    pub async fn try_get_with<F, E>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: Future<Output = Result<V, E>>,
    {
        let slot = self.slot_for(&key);
        let mut loaded = false;
        let outcome = slot
            .cell
            .get_or_try_init(|| {
                loaded = true;
                async move {
                    loader.await.map(|value| Stored {
                        value,
                        written_at: Instant::now(),
                    })
                }
            })
            .await;
        match outcome {
            Ok(stored) => {
                let value = stored.value.clone();
                self.after_lookup(loaded);
                Ok(value)
            }
            Err(error) => {
                self.stats.record_miss();
                self.stats.record_load_failure();
                tracing::debug!(cache = self.name, "cache load failed");
                Err(error)
            }
        }
    }

    pub fn get_if_present(&self, key: &K) -> Option<V> {
        let fresh = self.entries.get(key).and_then(|slot| {
            if slot.is_expired(self.ttl) {
                None
            } else {
                slot.cell.get().map(|stored| stored.value.clone())
            }
        });
        match fresh {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                let removed = self
                    .entries
                    .remove_if(key, |_, slot| slot.is_expired(self.ttl))
                    .is_some();
                self.stats.record_evictions(u64::from(removed));
                self.stats.record_miss();
                None
            }
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, Arc::new(Slot::filled(value)));
        self.enforce_capacity();
    }

    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Number of loaded, unexpired entries.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.cell.initialized() && !entry.is_expired(self.ttl))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired entries and abandoned load slots, then enforces the size
    /// bound. Returns the number of evicted entries.
    pub fn cleanup(&self) -> usize {
        let ttl = self.ttl;
        let mut expired = 0;
        self.entries.retain(|_, slot| {
            if slot.is_expired(ttl) {
                expired += 1;
                return false;
            }
            // An empty slot nobody else holds belongs to a failed or
            // cancelled load.
            slot.cell.initialized() || Arc::strong_count(slot) > 1
        });
        self.stats.record_evictions(expired as u64);
        let evicted = expired + self.enforce_capacity();
        if evicted > 0 {
            tracing::debug!(cache = self.name, evicted, "cache cleanup");
        }
        evicted
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    fn slot_for(&self, key: &K) -> Arc<Slot<V>> {
        let mut slot = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::empty()));
        if slot.is_expired(self.ttl) {
            *slot = Arc::new(Slot::empty());
            self.stats.record_evictions(1);
        }
        Arc::clone(slot.value())
    }

    fn after_lookup(&self, loaded: bool) {
        if loaded {
            self.stats.record_miss();
            self.enforce_capacity();
        } else {
            self.stats.record_hit();
        }
    }

    fn enforce_capacity(&self) -> usize {
        let mut written: Vec<(Instant, K)> = self
            .entries
            .iter()
            .filter_map(|entry| entry.written_at().map(|at| (at, entry.key().clone())))
            .collect();
        if written.len() <= self.max_entries {
            return 0;
        }
        written.sort_by_key(|(at, _)| *at);
        let overflow = written.len() - self.max_entries;
        let mut evicted = 0;
        for (_, key) in written.into_iter().take(overflow) {
            if self.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        self.stats.record_evictions(evicted as u64);
        evicted
    }
}
