// ABOUTME: Tests for the bounded LRU cache.
// ABOUTME: Covers eviction order, lazy capacity shrink, recency rules, and thread safety.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::lru::LruCache;
use crate::error::CacheError;

#[test]
fn test_zero_capacity_rejected() {
    let result = LruCache::<&str, i32>::new(0);
    assert_eq!(result.err(), Some(CacheError::InvalidCapacity(0)));
}

#[test]
fn test_put_and_get() {
    let cache = LruCache::new(3).unwrap();
    assert_eq!(cache.put("a", 1), None);
    assert_eq!(cache.get(&"a"), Some(1));
    assert_eq!(cache.get(&"missing"), None);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_put_returns_previous_value() {
    let cache = LruCache::new(3).unwrap();
    cache.put("a", 1);
    assert_eq!(cache.put("a", 2), Some(1));
    assert_eq!(cache.get(&"a"), Some(2));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_eviction_follows_recency() {
    let cache = LruCache::new(2).unwrap();
    cache.put("A", 1);
    cache.put("B", 2);
    assert_eq!(cache.get(&"A"), Some(1));
    cache.put("C", 3);

    assert_eq!(cache.get(&"B"), None);
    assert_eq!(cache.get(&"A"), Some(1));
    assert_eq!(cache.get(&"C"), Some(3));
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_put_existing_key_refreshes_recency() {
    let cache = LruCache::new(2).unwrap();
    cache.put("A", 1);
    cache.put("B", 2);
    cache.put("A", 10);
    cache.put("C", 3);

    assert!(!cache.contains_key(&"B"));
    assert_eq!(cache.get(&"A"), Some(10));
}

#[test]
fn test_contains_key_does_not_touch_recency() {
    let cache = LruCache::new(2).unwrap();
    cache.put("A", 1);
    cache.put("B", 2);

    // A stays least-recently used despite the lookup
    assert!(cache.contains_key(&"A"));
    cache.put("C", 3);

    assert!(!cache.contains_key(&"A"));
    assert!(cache.contains_key(&"B"));
    assert!(cache.contains_key(&"C"));
}

#[test]
fn test_peek_does_not_touch_recency() {
    let cache = LruCache::new(2).unwrap();
    cache.put("A", 1);
    cache.put("B", 2);
    assert_eq!(cache.peek(&"A"), Some(1));
    cache.put("C", 3);
    assert_eq!(cache.peek(&"A"), None);
}

#[test]
fn test_remove_absent_key_is_noop() {
    let cache = LruCache::new(2).unwrap();
    cache.put("A", 1);
    assert_eq!(cache.remove(&"Z"), None);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_remove_returns_value() {
    let cache = LruCache::new(2).unwrap();
    cache.put("A", 1);
    assert_eq!(cache.remove(&"A"), Some(1));
    assert!(cache.is_empty());
    assert_eq!(cache.remove(&"A"), None);
}

#[test]
fn test_removed_slot_is_reused() {
    let cache = LruCache::new(2).unwrap();
    cache.put("A", 1);
    cache.put("B", 2);
    cache.remove(&"A");
    cache.put("C", 3);
    cache.put("D", 4);

    // B was least-recently used once C and D arrived
    assert_eq!(cache.keys(), vec!["D", "C"]);
}

#[test]
fn test_removed_and_evicted_keys_are_dropped() {
    let cache = LruCache::new(1).unwrap();
    let removed = Arc::new("removed".to_string());
    let evicted = Arc::new("evicted".to_string());

    cache.put(removed.clone(), 1);
    assert_eq!(Arc::strong_count(&removed), 3);
    cache.remove(&removed);
    assert_eq!(Arc::strong_count(&removed), 1);

    cache.put(evicted.clone(), 2);
    cache.put(Arc::new("newer".to_string()), 3);
    assert_eq!(Arc::strong_count(&evicted), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_clear() {
    let cache = LruCache::new(3).unwrap();
    cache.put(1, "one");
    cache.put(2, "two");
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.get(&1), None);
    assert_eq!(cache.capacity(), 3);

    cache.put(3, "three");
    assert_eq!(cache.get(&3), Some("three"));
}

#[test]
fn test_set_capacity_rejects_zero() {
    let cache = LruCache::<u32, u32>::new(2).unwrap();
    assert_eq!(cache.set_capacity(0), Err(CacheError::InvalidCapacity(0)));
    assert_eq!(cache.capacity(), 2);
}

#[test]
fn test_capacity_shrink_is_lazy() {
    let cache = LruCache::new(5).unwrap();
    for i in 1..=4 {
        cache.put(i, i * 10);
    }

    cache.set_capacity(2).unwrap();
    assert_eq!(cache.len(), 4);

    cache.put(5, 50);
    assert_eq!(cache.len(), 2);
    // The two most recent survive: 5 and 4
    assert_eq!(cache.keys(), vec![5, 4]);
}

#[test]
fn test_capacity_grow_allows_more_entries() {
    let cache = LruCache::new(1).unwrap();
    cache.put("a", 1);
    cache.set_capacity(3).unwrap();
    cache.put("b", 2);
    cache.put("c", 3);
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_keys_in_recency_order() {
    let cache = LruCache::new(3).unwrap();
    cache.put("a", 1);
    cache.put("b", 2);
    cache.put("c", 3);
    cache.get(&"a");
    assert_eq!(cache.keys(), vec!["a", "c", "b"]);
}

#[test]
fn test_stats() {
    let cache = LruCache::new(1).unwrap();
    cache.put("a", 1);
    cache.put("a", 2);
    cache.get(&"a");
    cache.get(&"b");
    cache.put("b", 3);
    cache.remove(&"b");

    let stats = cache.stats();
    assert_eq!(stats.insertions, 2);
    assert_eq!(stats.updates, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.removals, 1);
    assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn test_size_never_exceeds_capacity() {
    let cache = LruCache::new(7).unwrap();
    for i in 0..500u64 {
        cache.put(i % 23, i);
        if i % 3 == 0 {
            cache.get(&(i % 11));
        }
        assert!(cache.len() <= 7);
    }
}

#[test]
fn test_concurrent_stress_keeps_capacity() {
    const CAPACITY: usize = 16;
    let cache = Arc::new(LruCache::new(CAPACITY).unwrap());
    let stop = Arc::new(AtomicBool::new(false));
    let mut handles = Vec::new();

    for worker in 0..8u64 {
        let cache = cache.clone();
        let stop = stop.clone();
        handles.push(std::thread::spawn(move || {
            let mut seed = worker.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
            while !stop.load(Ordering::Relaxed) {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                let key = seed % 64;
                match seed % 3 {
                    0 => {
                        cache.get(&key);
                    }
                    1 => {
                        cache.put(key, worker);
                    }
                    _ => {
                        cache.remove(&key);
                    }
                }
            }
        }));
    }

    let deadline = Instant::now() + Duration::from_millis(200);
    while Instant::now() < deadline {
        assert!(cache.len() <= CAPACITY);
        std::thread::sleep(Duration::from_millis(1));
    }
    stop.store(true, Ordering::Relaxed);

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
    assert!(cache.len() <= CAPACITY);
}

#[test]
fn test_concurrent_puts_same_key_last_writer_wins() {
    let cache = Arc::new(LruCache::new(4).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                cache.put("shared", i);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let value = cache.get(&"shared").unwrap();
    assert!((0..4).contains(&value));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().updates, 3);
}
