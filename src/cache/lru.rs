// ABOUTME: Bounded, thread-safe least-recently-used cache.
// ABOUTME: Hash map plus arena-backed recency list, guarded by one mutex.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::error::CacheError;

/// Null link in the recency list.
const NIL: usize = usize::MAX;

/// Counters for cache activity since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub updates: u64,
    pub evictions: u64,
    pub removals: u64,
}

impl CacheStats {
    /// Fraction of `get` calls that found a value. 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A freed slot holds neither key nor value until it is reused.
struct Slot<K, V> {
    key: Option<K>,
    value: Option<V>,
    prev: usize,
    next: usize,
}

/// Unsynchronized cache state. Every access goes through `LruCache`'s mutex.
struct LruState<K, V> {
    capacity: usize,
    index: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    /// Most-recently used.
    head: usize,
    /// Least-recently used.
    tail: usize,
    free: Vec<usize>,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone, V> LruState<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
            free: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);

        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }

        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }

    fn attach_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head != idx {
            self.detach(idx);
            self.attach_front(idx);
        }
    }

    fn allocate(&mut self, key: K, value: V) -> usize {
        let slot = Slot {
            key: Some(key),
            value: Some(value),
            prev: NIL,
            next: NIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    /// Unlinks and frees the slot, handing back its value.
    fn release(&mut self, idx: usize) -> Option<V> {
        self.detach(idx);
        if let Some(key) = self.slots[idx].key.take() {
            self.index.remove(&key);
        }
        self.free.push(idx);
        self.slots[idx].value.take()
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        match self.index.get(key).copied() {
            Some(idx) => {
                self.touch(idx);
                self.stats.hits += 1;
                self.slots[idx].value.as_ref()
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    fn put(&mut self, key: K, value: V) -> Option<V> {
        if let Some(idx) = self.index.get(&key).copied() {
            self.touch(idx);
            self.stats.updates += 1;
            return self.slots[idx].value.replace(value);
        }

        let idx = self.allocate(key.clone(), value);
        self.attach_front(idx);
        self.index.insert(key, idx);
        self.stats.insertions += 1;

        // Loops rather than evicting once so a lazily shrunk capacity is honored.
        while self.len() > self.capacity && self.tail != NIL {
            self.release(self.tail);
            self.stats.evictions += 1;
            tracing::trace!(capacity = self.capacity, "evicted least-recently-used entry");
        }

        None
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index.get(key).copied()?;
        self.stats.removals += 1;
        self.release(idx)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while cursor != NIL {
            keys.extend(self.slots[cursor].key.iter().cloned());
            cursor = self.slots[cursor].next;
        }
        keys
    }
}

/// A fixed-capacity key-value store that evicts the least-recently-used entry
/// on overflow.
///
/// Every method takes the same mutex for its whole duration, so operations
/// are totally ordered and never observe a half-updated structure. `get` and
/// `put` promote the key to most-recently used; `contains_key` and `peek` do
/// not.
///
/// Shrinking the capacity with [`set_capacity`](Self::set_capacity) is lazy:
/// entries above the new limit stay until the next `put`.
pub struct LruCache<K, V> {
    state: Mutex<LruState<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        Ok(Self {
            state: Mutex::new(LruState::new(capacity)),
        })
    }

    /// Create a cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::new(config.capacity)
    }

    /// Look up a value, marking the key most-recently used.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.state.lock().get(key).cloned()
    }

    /// Look up a value without changing recency.
    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let state = self.state.lock();
        state
            .index
            .get(key)
            .and_then(|&idx| state.slots[idx].value.clone())
    }

    /// Insert or replace a value, returning the previous one.
    ///
    /// The key becomes most-recently used. If the cache is now over capacity,
    /// least-recently-used entries are evicted until it fits.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.state.lock().put(key, value)
    }

    /// Remove a key, returning its value if it was present.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.state.lock().remove(key)
    }

    /// Check for a key without changing recency.
    pub fn contains_key(&self, key: &K) -> bool {
        self.state.lock().index.contains_key(key)
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Capacity and statistics are kept.
    pub fn clear(&self) {
        self.state.lock().clear();
    }

    /// Current capacity limit.
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Change the capacity limit. Takes effect on the next `put`.
    pub fn set_capacity(&self, capacity: usize) -> Result<(), CacheError> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        let mut state = self.state.lock();
        tracing::debug!(from = state.capacity, to = capacity, "cache capacity changed");
        state.capacity = capacity;
        Ok(())
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    /// Snapshot of the keys from most- to least-recently used.
    pub fn keys(&self) -> Vec<K> {
        self.state.lock().keys()
    }
}

impl<K, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LruCache")
            .field("capacity", &state.capacity)
            .field("len", &state.index.len())
            .field("stats", &state.stats)
            .finish()
    }
}
