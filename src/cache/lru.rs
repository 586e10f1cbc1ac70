//! Eviction Ledger Module
//!
//! Doubly-linked recency list stored in a slab, ordered from most recently
//! used (front) to least recently used (back).

use crate::cache::CacheEntry;

// == Handle ==
/// Opaque reference to a ledger slot.
///
/// Only valid until the entry it refers to is removed; slots are reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

#[derive(Debug)]
struct Node {
    entry: CacheEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Eviction Ledger ==
/// Recency order with O(1) push-front, move-to-front and remove.
///
/// Has no internal locking; callers provide single-writer exclusion.
#[derive(Debug, Default)]
pub struct EvictionLedger {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl EvictionLedger {
    // == Constructor ==
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ledger with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    // == Push Front ==
    /// Inserts `entry` as the most recently used and returns its handle.
    pub fn push_front(&mut self, entry: CacheEntry) -> Handle {
        let node = Node {
            entry,
            prev: None,
            next: self.head,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.head {
            Some(old_head) => self.node_mut(old_head).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;

        Handle(idx)
    }

    // == Move To Front ==
    /// Marks the entry behind `handle` as most recently used.
    pub fn move_to_front(&mut self, handle: Handle) {
        let idx = handle.0;
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);

        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    // == Back ==
    /// Returns the least recently used handle, if any.
    pub fn back(&self) -> Option<Handle> {
        self.tail.map(Handle)
    }

    // == Remove ==
    /// Unlinks the entry behind `handle` and returns it.
    pub fn remove(&mut self, handle: Handle) -> CacheEntry {
        let idx = handle.0;
        self.unlink(idx);
        self.len -= 1;
        self.free.push(idx);

        match self.slots[idx].take() {
            Some(node) => node.entry,
            None => unreachable!("ledger handle {} refers to a vacant slot", idx),
        }
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<CacheEntry> {
        self.back().map(|handle| self.remove(handle))
    }

    // == Get ==
    /// Returns the entry behind `handle` without changing its recency.
    pub fn get(&self, handle: Handle) -> &CacheEntry {
        &self.node(handle.0).entry
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Iteration ==
    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &CacheEntry)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let idx = cursor?;
            let node = self.node(idx);
            cursor = node.next;
            Some((Handle(idx), &node.entry))
        })
    }

    /// Verifies that forward and backward links agree with `len`.
    pub fn check_links(&self) -> std::result::Result<(), String> {
        let mut count = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self
                .slots
                .get(idx)
                .and_then(Option::as_ref)
                .ok_or_else(|| format!("link to vacant slot {}", idx))?;
            if node.prev != prev {
                return Err(format!("slot {} has a stale prev link", idx));
            }
            count += 1;
            if count > self.len {
                return Err("cycle in recency list".to_string());
            }
            prev = Some(idx);
            cursor = node.next;
        }
        if prev != self.tail {
            return Err("tail does not match last node".to_string());
        }
        if count != self.len {
            return Err(format!("walked {} nodes, len is {}", count, self.len));
        }
        Ok(())
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    fn node(&self, idx: usize) -> &Node {
        match self.slots.get(idx).and_then(Option::as_ref) {
            Some(node) => node,
            None => unreachable!("ledger handle {} refers to a vacant slot", idx),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        match self.slots.get_mut(idx).and_then(Option::as_mut) {
            Some(node) => node,
            None => unreachable!("ledger handle {} refers to a vacant slot", idx),
        }
    }
}
