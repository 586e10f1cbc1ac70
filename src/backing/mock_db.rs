//! Mock Database
//!
//! In-memory backing store with artificial latency and injectable failures.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::BackingStore;
use crate::error::LoadError;

// == Mock DB ==
/// Simulated database.
///
/// Unknown keys resolve to `value-for-<key>` unless strict mode is on.
#[derive(Debug, Default)]
pub struct MockDb {
    /// Explicit key -> value table
    data: HashMap<String, String>,
    /// Delay applied to every load
    latency: Duration,
    /// Reject keys missing from `data`
    strict: bool,
    /// Keys whose loads currently fail
    failing: RwLock<HashSet<String>>,
    /// Per-key call counts
    calls: Mutex<HashMap<String, u64>>,
    total_calls: AtomicU64,
}

impl MockDb {
    // == Constructor ==
    /// Creates an empty mock database with the given per-call latency.
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Adds an explicit entry.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Makes loads of keys without an explicit entry fail.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    // == Failure Injection ==
    /// Makes every subsequent load of `key` fail until healed.
    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing.write().insert(key.into());
    }

    pub fn heal_key(&self, key: &str) {
        self.failing.write().remove(key);
    }

    // == Call Accounting ==
    /// Number of loads issued for `key`.
    pub fn calls(&self, key: &str) -> u64 {
        self.calls.lock().get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, key: &str) -> Result<String, LoadError> {
        if self.failing.read().contains(key) {
            return Err(LoadError::new(format!("database error reading '{}'", key)));
        }
        match self.data.get(key) {
            Some(value) => Ok(value.clone()),
            None if self.strict => Err(LoadError::new(format!("no row for key '{}'", key))),
            None => Ok(format!("value-for-{}", key)),
        }
    }
}

impl BackingStore for MockDb {
    fn load(&self, key: &str) -> impl Future<Output = Result<String, LoadError>> + Send {
        async move {
            *self.calls.lock().entry(key.to_string()).or_insert(0) += 1;
            self.total_calls.fetch_add(1, Ordering::SeqCst);
            debug!("MockDb: loading key '{}'", key);

            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.lookup(key)
        }
    }
}
