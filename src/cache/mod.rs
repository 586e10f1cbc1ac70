//! Cache Module
//!
//! Provides a read-through LRU cache with single-flight loading.

mod dedup;
mod entry;
mod lru;
mod state;
mod stats;
mod store;


// Re-export public types
pub use dedup::{LoadDeduplicator, PendingLoad};
pub use entry::CacheEntry;
pub use lru::{EvictionLedger, Handle};
pub use state::{CacheState, InsertOutcome};
pub use stats::{CacheStats, StatsRecorder};
pub use store::Cache;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
