//! Cache Module
//!
//! Read-through LRU cache combining the index/ledger state, the load
//! deduplicator and a backing store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backing::BackingStore;
use crate::cache::{CacheState, CacheStats, LoadDeduplicator, PendingLoad, StatsRecorder};
use crate::error::{CacheError, Result};

// == Cache ==
/// Bounded, concurrency-safe LRU cache in front of a [`BackingStore`].
///
/// Cloning is cheap and every clone shares the same entries.
///
/// # Locking
/// - One reader-writer lock guards the key index and eviction ledger together.
/// - The deduplicator's marker table has its own lock; neither lock is ever
///   held while acquiring the other, and the backing store is never called
///   with either held.
pub struct Cache<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    state: RwLock<CacheState>,
    store: S,
    loads: LoadDeduplicator<String>,
    stats: StatsRecorder,
}

enum Lookup {
    Hit(String),
    Miss(PendingLoad<String>),
}

impl<S> Clone for Cache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: BackingStore> Cache<S> {
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is rejected.
    pub fn new(store: S, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::Configuration(
                "capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                state: RwLock::new(CacheState::new(capacity)),
                store,
                loads: LoadDeduplicator::new(),
                stats: StatsRecorder::new(),
            }),
        })
    }

    // == Get ==
    /// Returns the value for `key`, loading it from the backing store on a
    /// miss.
    ///
    /// Concurrent misses on the same key share a single load. A failed load
    /// is returned to every caller that shared it and is not cached.
    pub async fn get(&self, key: &str) -> Result<String> {
        match self.lookup(key).await {
            Lookup::Hit(value) => Ok(value),
            Lookup::Miss(pending) => {
                let value = pending.wait().await?;
                Ok(self.inner.insert_loaded(key, value).await)
            }
        }
    }

    // == Get With Timeout ==
    /// Like [`Cache::get`], but gives up after `timeout` while waiting on
    /// the load.
    ///
    /// Timing out only affects this caller: the load keeps running, other
    /// waiters still receive its result and a successful value is cached.
    pub async fn get_with_timeout(&self, key: &str, timeout: Duration) -> Result<String> {
        match self.lookup(key).await {
            Lookup::Hit(value) => Ok(value),
            Lookup::Miss(pending) => {
                let value = match tokio::time::timeout(timeout, pending.wait()).await {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!("Timed out waiting {:?} for key '{}'", timeout, key);
                        return Err(CacheError::Timeout {
                            key: key.to_string(),
                            after_ms: duration_ms(timeout),
                        });
                    }
                };
                Ok(self.inner.insert_loaded(key, value).await)
            }
        }
    }

    // == Lookup ==
    /// Hit path under the read lock, promotion under the write lock, and
    /// registration on a (possibly shared) load on a miss.
    async fn lookup(&self, key: &str) -> Lookup {
        let cached = {
            let state = self.inner.state.read().await;
            state.peek(key).map(str::to_string)
        };

        if let Some(value) = cached {
            // The entry may have been evicted between the two locks; the
            // caller still gets the value it read.
            self.inner.state.write().await.promote(key);
            self.inner.stats.record_hit();
            debug!("Cache hit for key '{}'", key);
            return Lookup::Hit(value);
        }

        self.inner.stats.record_miss();
        debug!("Cache miss for key '{}'", key);

        let inner = Arc::clone(&self.inner);
        let pending = self
            .inner
            .loads
            .load(key, move |key| async move { inner.load_and_insert(key).await });
        if !pending.started() {
            self.inner.stats.record_deduplicated();
        }
        Lookup::Miss(pending)
    }

    // == Introspection ==
    /// Returns a snapshot of cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.inner.state.read().await;
        self.inner.stats.snapshot(state.len(), state.capacity())
    }

    pub async fn len(&self) -> usize {
        self.inner.state.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.read().await.is_empty()
    }

    /// Checks for `key` without loading it or changing its recency.
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.state.read().await.contains(key)
    }

    /// Cached keys from most to least recently used.
    pub async fn keys_by_recency(&self) -> Vec<String> {
        self.inner.state.read().await.keys_by_recency()
    }

    /// Verifies the index/ledger invariants.
    pub async fn check_invariants(&self) -> std::result::Result<(), String> {
        self.inner.state.read().await.check_invariants()
    }

    pub async fn capacity(&self) -> usize {
        self.inner.state.read().await.capacity()
    }

    /// Number of keys currently being loaded.
    pub fn in_flight(&self) -> usize {
        self.inner.loads.in_flight()
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }
}

impl<S: BackingStore> Inner<S> {
    /// Body of a deduplicated load; runs on its own task.
    async fn load_and_insert(self: Arc<Self>, key: String) -> Result<String> {
        self.stats.record_load();

        match self.store.load(&key).await {
            Ok(value) => {
                let value = self.insert_loaded(&key, value).await;
                info!("Loaded key '{}' from backing store", key);
                Ok(value)
            }
            Err(err) => {
                self.stats.record_load_failure();
                warn!("Backing store failed for key '{}': {}", key, err);
                Err(CacheError::load(key, err))
            }
        }
    }

    /// Double-checked insert of a loaded value under the write lock.
    ///
    /// Assumes every load of a key yields an equivalent value: if the key is
    /// already cached, the existing entry is kept and `value` is discarded.
    async fn insert_loaded(&self, key: &str, value: String) -> String {
        let outcome = self.state.write().await.insert(key, value);

        if outcome.already_present {
            debug!("Discarded reloaded value for key '{}'", key);
        }
        if let Some(evicted) = &outcome.evicted {
            self.stats.record_eviction();
            debug!("Evicted key '{}' to make room for '{}'", evicted, key);
        }
        outcome.value
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
