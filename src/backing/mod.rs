//! Backing Store Module
//!
//! The slow source of truth the cache sits in front of.

mod mock_db;

use std::future::Future;

use crate::error::LoadError;

pub use mock_db::MockDb;

// == Backing Store ==
/// Key/value source consulted on every cache miss.
///
/// Implementations may be slow. The cache issues at most one concurrent
/// call per key but calls for distinct keys overlap freely.
pub trait BackingStore: Send + Sync + 'static {
    /// Fetches the value for `key`.
    fn load(&self, key: &str) -> impl Future<Output = Result<String, LoadError>> + Send;
}
