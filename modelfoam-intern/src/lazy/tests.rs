use crate::lazy::{KeyedLazyCache, LazySlot};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test_log::test]
fn slot_computes_once_until_reclaimed() {
    let slot = LazySlot::new();
    let computed = AtomicUsize::new(0);
    let compute = || {
        computed.fetch_add(1, Ordering::SeqCst);
        vec![1, 2, 3]
    };

    assert!(!slot.is_present());
    let first = slot.get_or_compute(compute);
    let second = slot.get_or_compute(compute);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(computed.load(Ordering::SeqCst), 1);

    assert!(slot.reclaim());
    assert!(!slot.is_present());
    assert!(slot.peek().is_none());
    assert!(!slot.reclaim());

    let third = slot.get_or_compute(compute);
    assert_eq!(*third, vec![1, 2, 3]);
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(computed.load(Ordering::SeqCst), 2);
}

#[test_log::test]
fn reclaimed_value_stays_valid_for_holders() {
    let slot = LazySlot::with_value(Arc::new("quads".to_string()));
    let held = slot.peek().unwrap();
    slot.reclaim();
    assert_eq!(held.as_str(), "quads");
}

#[test_log::test]
fn keyed_cache_is_coherent_between_reclaims() {
    let cache = KeyedLazyCache::with_capacity(16);
    let computed = AtomicUsize::new(0);
    let compute = |key: &u32| {
        computed.fetch_add(1, Ordering::SeqCst);
        format!("value {}", key)
    };

    let first = cache.get(&1, compute);
    assert_eq!(first.as_str(), "value 1");
    assert!(Arc::ptr_eq(&first, &cache.get(&1, compute)));
    cache.get(&2, compute);
    assert_eq!(cache.len(), 2);
    assert_eq!(computed.load(Ordering::SeqCst), 2);

    assert!(cache.reclaim(&1));
    assert!(cache.peek(&1).is_none());
    let recomputed = cache.get(&1, compute);
    assert_eq!(recomputed.as_str(), "value 1");
    assert!(!Arc::ptr_eq(&first, &recomputed));
    assert_eq!(computed.load(Ordering::SeqCst), 3);

    cache.reclaim_all();
    assert!(cache.is_empty());
}

#[test_log::test]
fn keyed_cache_returns_the_fresh_value_on_miss() {
    let cache = KeyedLazyCache::with_capacity(16);
    let value = cache.get(&"key".to_string(), |k| k.len());
    assert_eq!(*value, 3);
    assert!(Arc::ptr_eq(&value, &cache.peek(&"key".to_string()).unwrap()));
}
