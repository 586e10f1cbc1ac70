//! Load Deduplication Module
//!
//! Single-flight loading: at most one load per key is in flight, and every
//! concurrent caller for that key receives the same outcome.

use std::collections::hash_map::{Entry, HashMap};
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{CacheError, Result};

type Notifier<V> = oneshot::Sender<Result<V>>;
type InflightMap<V> = Arc<Mutex<HashMap<String, Vec<Notifier<V>>>>>;

// == Load Deduplicator ==
/// Per-key in-flight markers with fan-out on completion.
///
/// The marker table lock is only held for bookkeeping and never across an
/// await point. Loads run on their own task, so a caller that stops waiting
/// does not cancel the load or disturb other waiters.
#[derive(Debug)]
pub struct LoadDeduplicator<V> {
    inflight: InflightMap<V>,
}

impl<V> Default for LoadDeduplicator<V> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<V> LoadDeduplicator<V>
where
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    // == Load ==
    /// Joins the in-flight load for `key`, or starts one with `loader`.
    ///
    /// `loader` is only invoked when no load for `key` is outstanding. Must be
    /// called from within a tokio runtime.
    pub fn load<F, Fut>(&self, key: &str, loader: F) -> PendingLoad<V>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let started = {
            let mut inflight = self.inflight.lock();
            match inflight.entry(key.to_string()) {
                Entry::Occupied(mut waiters) => {
                    waiters.get_mut().push(tx);
                    false
                }
                Entry::Vacant(slot) => {
                    slot.insert(vec![tx]);
                    true
                }
            }
        };

        if started {
            let completion = Completion {
                inflight: Arc::clone(&self.inflight),
                key: key.to_string(),
                done: false,
            };
            let fut = loader(key.to_string());
            tokio::spawn(async move {
                let result = fut.await;
                completion.complete(result);
            });
        } else {
            debug!("Joined in-flight load for key '{}'", key);
        }

        PendingLoad {
            key: key.to_string(),
            rx,
            started,
        }
    }

    // == In Flight ==
    /// Number of keys with an outstanding load.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_loading(&self, key: &str) -> bool {
        self.inflight.lock().contains_key(key)
    }
}

// == Completion ==
/// Clears the marker for one load and releases its waiters.
///
/// Dropping without completing (loader panic, runtime shutdown) still clears
/// the marker; waiters then observe a closed channel.
struct Completion<V> {
    inflight: InflightMap<V>,
    key: String,
    done: bool,
}

impl<V: Clone> Completion<V> {
    fn complete(mut self, result: Result<V>) {
        let waiters = self.take_waiters();
        debug!(
            "Load for key '{}' finished, releasing {} waiter(s)",
            self.key,
            waiters.len()
        );
        for waiter in waiters {
            // Receiver gone means that caller stopped waiting.
            let _ = waiter.send(result.clone());
        }
    }
}

impl<V> Completion<V> {
    fn take_waiters(&mut self) -> Vec<Notifier<V>> {
        self.done = true;
        self.inflight.lock().remove(&self.key).unwrap_or_default()
    }
}

impl<V> Drop for Completion<V> {
    fn drop(&mut self) {
        if !self.done {
            self.take_waiters();
        }
    }
}

// == Pending Load ==
/// A caller's registration on an in-flight load.
#[derive(Debug)]
pub struct PendingLoad<V> {
    key: String,
    rx: oneshot::Receiver<Result<V>>,
    started: bool,
}

impl<V> PendingLoad<V> {
    /// True if this call started the load rather than joining one.
    pub fn started(&self) -> bool {
        self.started
    }

    // == Wait ==
    /// Waits for the load outcome.
    pub async fn wait(self) -> Result<V> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(CacheError::LoadAbandoned(self.key)),
        }
    }
}
