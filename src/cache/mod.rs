// ABOUTME: Cache module - bounded key-value storage with LRU eviction.
// ABOUTME: All operations are atomic under concurrent access.

mod lru;

pub use lru::{CacheStats, LruCache};

#[cfg(test)]
mod lru_test;
