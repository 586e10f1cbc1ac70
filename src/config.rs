//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// How long a request waits on a backing store load, in milliseconds
    pub load_timeout_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Simulated backing store latency in milliseconds
    pub db_latency_ms: u64,
    /// Keys loaded into the cache at startup
    pub warmup_keys: Vec<String>,
    /// Maximum concurrent loads during warm-up
    pub warmup_concurrency: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 100)
    /// - `LOAD_TIMEOUT_MS` - Per-request load timeout (default: 5000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DB_LATENCY_MS` - Simulated database latency (default: 50)
    /// - `WARMUP_KEYS` - Comma-separated keys to preload (default: none)
    /// - `WARMUP_CONCURRENCY` - Parallel warm-up loads (default: 8)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            load_timeout_ms: parse_var("LOAD_TIMEOUT_MS").unwrap_or(defaults.load_timeout_ms),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            db_latency_ms: parse_var("DB_LATENCY_MS").unwrap_or(defaults.db_latency_ms),
            warmup_keys: env::var("WARMUP_KEYS")
                .map(|v| parse_key_list(&v))
                .unwrap_or(defaults.warmup_keys),
            warmup_concurrency: parse_var("WARMUP_CONCURRENCY")
                .unwrap_or(defaults.warmup_concurrency),
        }
    }

    /// Rejects settings the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::Configuration(
                "CACHE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.warmup_concurrency == 0 {
            return Err(CacheError::Configuration(
                "WARMUP_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn db_latency(&self) -> Duration {
        Duration::from_millis(self.db_latency_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 100,
            load_timeout_ms: 5000,
            server_port: 3000,
            db_latency_ms: 50,
            warmup_keys: Vec::new(),
            warmup_concurrency: 8,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
