//! Keystore Cache - A read-through LRU cache in front of a slow backing store
//!
//! Provides bounded LRU caching with single-flight loading, so concurrent
//! misses on the same key cost exactly one backing store call.

pub mod api;
pub mod backing;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use backing::{BackingStore, MockDb};
pub use cache::{Cache, CacheStats};
pub use config::Config;
pub use error::{CacheError, LoadError, Result};
pub use tasks::{spawn_warmup, WarmupReport};
