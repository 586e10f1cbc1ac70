//! Cache Entry Module
//!
//! Defines the key/value pair held by each ledger slot.

// == Cache Entry ==
/// A single cached key/value pair.
///
/// Never mutated after creation; a reload of the same key produces a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The key this entry is indexed under
    pub key: String,
    /// The loaded value
    pub value: String,
}

impl CacheEntry {
    // == Constructor ==
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
