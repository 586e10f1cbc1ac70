//! Concurrency Tests
//!
//! Many tasks hammering one cache: single-flight loading, parallel loads of
//! distinct keys, failure isolation and invariants under contention.

use std::sync::Arc;
use std::time::{Duration, Instant};

use keystore_cache::{Cache, CacheError, MockDb};
use tokio::sync::Barrier;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_share_one_load() {
    let cache = Cache::new(MockDb::new(Duration::from_millis(100)), 10).unwrap();
    let barrier = Arc::new(Barrier::new(32));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                cache.get("hot").await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "value-for-hot");
    }

    assert_eq!(cache.store().calls("hot"), 1);
    let stats = cache.stats().await;
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.misses + stats.hits, 32);
    assert_eq!(cache.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_load_in_parallel() {
    let delay = Duration::from_millis(200);
    let cache = Cache::new(MockDb::new(delay), 32).unwrap();

    let start = Instant::now();
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&format!("key-{}", i)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    let elapsed = start.elapsed();

    // Serialized loads would take 16 * 200ms.
    assert!(
        elapsed < delay * 4,
        "16 loads took {:?}, expected close to {:?}",
        elapsed,
        delay
    );
    assert_eq!(cache.store().total_calls(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failure_isolated_to_its_key() {
    let db = MockDb::new(Duration::from_millis(50));
    db.fail_key("a");
    let cache = Cache::new(db, 10).unwrap();

    let failing: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("a").await })
        })
        .collect();
    let healthy = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("b").await })
    };

    for handle in failing {
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(CacheError::Load { .. })));
    }
    assert_eq!(healthy.await.unwrap().unwrap(), "value-for-b");

    assert!(!cache.contains("a").await);
    assert!(cache.contains("b").await);
    cache.check_invariants().await.unwrap();

    // Failure is not cached: the next get retries.
    cache.store().heal_key("a");
    assert_eq!(cache.get("a").await.unwrap(), "value-for-a");
    assert_eq!(cache.store().calls("a"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_waiter_timeout_does_not_affect_other_waiters() {
    let cache = Cache::new(MockDb::new(Duration::from_millis(150)), 10).unwrap();

    let patient = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("k").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let impatient = cache.get_with_timeout("k", Duration::from_millis(20)).await;

    assert!(matches!(impatient, Err(CacheError::Timeout { .. })));
    assert_eq!(patient.await.unwrap().unwrap(), "value-for-k");
    assert_eq!(cache.store().calls("k"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_invariants_hold_under_contention() {
    let capacity = 8;
    let cache = Cache::new(MockDb::new(Duration::from_millis(1)), capacity).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let cache = cache.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    let key = format!("k{}", (i * 7 + t) % 24);
                    assert_eq!(cache.get(&key).await.unwrap(), format!("value-for-{}", key));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(cache.len().await <= capacity);
    cache.check_invariants().await.unwrap();
    let stats = cache.stats().await;
    assert_eq!(stats.hits + stats.misses, 16 * 50);
    assert_eq!(cache.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hits_never_reload() {
    let cache = Cache::new(MockDb::new(Duration::from_millis(5)), 4).unwrap();
    cache.get("stable").await.unwrap();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("stable").await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(cache.store().calls("stable"), 1);
    assert_eq!(cache.stats().await.hits, 20);
}
