//! Cache State Module
//!
//! The key index and eviction ledger, kept in lockstep. Always accessed
//! through the cache's single reader-writer lock.

use std::collections::HashMap;

use crate::cache::{CacheEntry, EvictionLedger, Handle};

// == Insert Outcome ==
/// Result of a post-load insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Value now cached under the key
    pub value: String,
    /// Key evicted to make room, if any
    pub evicted: Option<String>,
    /// True if the key was already cached and the loaded value was discarded
    pub already_present: bool,
}

// == Cache State ==
#[derive(Debug)]
pub struct CacheState {
    /// Key -> ledger handle
    index: HashMap<String, Handle>,
    /// Recency order of all cached entries
    ledger: EvictionLedger,
    capacity: usize,
}

impl CacheState {
    // == Constructor ==
    pub fn new(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            ledger: EvictionLedger::with_capacity(capacity),
            capacity,
        }
    }

    // == Peek ==
    /// Returns the cached value for `key` without touching recency.
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&handle| self.ledger.get(handle).value.as_str())
    }

    // == Promote ==
    /// Moves `key` to the front of the ledger.
    ///
    /// Returns false if the key was evicted since it was last observed.
    pub fn promote(&mut self, key: &str) -> bool {
        match self.index.get(key) {
            Some(&handle) => {
                self.ledger.move_to_front(handle);
                self.debug_check();
                true
            }
            None => false,
        }
    }

    // == Insert ==
    /// Inserts a freshly loaded value, evicting the least recently used
    /// entry when full.
    ///
    /// If `key` is already cached the existing entry wins and is promoted.
    pub fn insert(&mut self, key: &str, value: String) -> InsertOutcome {
        if let Some(&handle) = self.index.get(key) {
            self.ledger.move_to_front(handle);
            self.debug_check();
            return InsertOutcome {
                value: self.ledger.get(handle).value.clone(),
                evicted: None,
                already_present: true,
            };
        }

        let mut evicted = None;
        if self.index.len() >= self.capacity {
            if let Some(victim) = self.ledger.pop_back() {
                self.index.remove(&victim.key);
                evicted = Some(victim.key);
            }
        }

        let handle = self.ledger.push_front(CacheEntry::new(key, value.clone()));
        self.index.insert(key.to_string(), handle);
        self.debug_check();

        InsertOutcome {
            value,
            evicted,
            already_present: false,
        }
    }

    // == Accessors ==
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.ledger.iter().map(|(_, e)| e.key.clone()).collect()
    }

    // == Invariants ==
    /// Checks the index/ledger bijection, the capacity bound and list links.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        self.ledger.check_links()?;

        if self.index.len() != self.ledger.len() {
            return Err(format!(
                "index has {} keys, ledger has {} entries",
                self.index.len(),
                self.ledger.len()
            ));
        }
        if self.ledger.len() > self.capacity {
            return Err(format!(
                "{} entries exceed capacity {}",
                self.ledger.len(),
                self.capacity
            ));
        }
        for (handle, entry) in self.ledger.iter() {
            if self.index.get(&entry.key) != Some(&handle) {
                return Err(format!("key '{}' is not indexed to its slot", entry.key));
            }
        }
        Ok(())
    }

    /// Full invariant scan after every mutation in debug builds.
    fn debug_check(&self) {
        debug_assert_eq!(self.check_invariants(), Ok(()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_peek() {
        let mut state = CacheState::new(2);

        let outcome = state.insert("a", "1".to_string());
        assert_eq!(outcome.value, "1");
        assert!(outcome.evicted.is_none());
        assert!(!outcome.already_present);
        assert_eq!(state.peek("a"), Some("1"));
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_evicts_lru() {
        let mut state = CacheState::new(2);

        state.insert("a", "1".to_string());
        state.insert("b", "2".to_string());
        let outcome = state.insert("c", "3".to_string());

        assert_eq!(outcome.evicted, Some("a".to_string()));
        assert!(!state.contains("a"));
        assert_eq!(state.len(), 2);
        assert_eq!(state.keys_by_recency(), vec!["c", "b"]);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_existing_keeps_first_value() {
        let mut state = CacheState::new(2);

        state.insert("a", "first".to_string());
        state.insert("b", "2".to_string());
        let outcome = state.insert("a", "second".to_string());

        assert!(outcome.already_present);
        assert_eq!(outcome.value, "first");
        assert_eq!(state.keys_by_recency(), vec!["a", "b"]);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_promote_changes_victim() {
        let mut state = CacheState::new(2);

        state.insert("a", "1".to_string());
        state.insert("b", "2".to_string());
        assert!(state.promote("a"));

        let outcome = state.insert("c", "3".to_string());
        assert_eq!(outcome.evicted, Some("b".to_string()));
        assert!(state.contains("a"));
    }

    #[test]
    fn test_promote_missing_key() {
        let mut state = CacheState::new(1);
        assert!(!state.promote("ghost"));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "index has 2 keys")]
    fn test_mutation_on_corrupted_state_panics() {
        let mut state = CacheState::new(4);
        state.insert("a", "1".to_string());

        // Second key pointing at the same slot breaks the bijection.
        let handle = state.index["a"];
        state.index.insert("ghost".to_string(), handle);
        state.promote("a");
    }

    #[test]
    fn test_capacity_one() {
        let mut state = CacheState::new(1);

        state.insert("a", "1".to_string());
        let outcome = state.insert("b", "2".to_string());

        assert_eq!(outcome.evicted, Some("a".to_string()));
        assert_eq!(state.keys_by_recency(), vec!["b"]);
        state.check_invariants().unwrap();
    }
}
