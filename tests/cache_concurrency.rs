//! Merge cache TTL and single-flight behaviour under concurrent readers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use catalog_merge::cache::{ManualClock, MergeCache, DEFAULT_TTL};
use catalog_merge::{
    DirectiveStore, MemoryStore, MergeDirective, MergeError, MergeRegistry, StoreError,
};

/// Memory store that counts scans and makes each scan slow enough for
/// readers to pile up behind it.
#[derive(Default)]
struct SlowCountingStore {
    inner: MemoryStore,
    scans: AtomicU64,
    failing: AtomicBool,
}

impl DirectiveStore for SlowCountingStore {
    fn load_all(&self) -> Result<Vec<MergeDirective>, StoreError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::LockTimeout(Duration::from_millis(50)));
        }
        self.inner.load_all()
    }

    fn insert_checked(&self, directive: MergeDirective) -> Result<MergeDirective, MergeError> {
        self.inner.insert_checked(directive)
    }

    fn remove(&self, id: &str) -> Result<Option<MergeDirective>, StoreError> {
        self.inner.remove(id)
    }
}

fn setup() -> (Arc<SlowCountingStore>, MergeRegistry, Arc<ManualClock>, Arc<MergeCache>) {
    let store = Arc::new(SlowCountingStore::default());
    let registry = MergeRegistry::new(store.clone());
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(MergeCache::with_clock(
        registry.clone(),
        DEFAULT_TTL,
        clock.clone(),
    ));
    (store, registry, clock, cache)
}

#[test]
fn test_ttl_timeline() {
    let (store, registry, clock, cache) = setup();
    registry.create("p", "s").unwrap();

    // t0: first read builds
    let t0 = cache.read().unwrap();
    assert_eq!(store.scans.load(Ordering::SeqCst), 1);

    // t0 + 30s: same snapshot
    clock.advance(Duration::from_secs(30));
    let t30 = cache.read().unwrap();
    assert!(Arc::ptr_eq(&t0, &t30));
    assert_eq!(store.scans.load(Ordering::SeqCst), 1);

    // t0 + 61s: rebuilt
    clock.advance(Duration::from_secs(31));
    let t61 = cache.read().unwrap();
    assert!(!Arc::ptr_eq(&t0, &t61));
    assert!(t61.is_hidden("s"));
    assert_eq!(store.scans.load(Ordering::SeqCst), 2);
}

#[test]
fn test_concurrent_expired_reads_rebuild_once() {
    let (store, registry, clock, cache) = setup();
    registry.create("p", "s").unwrap();
    cache.read().unwrap();
    clock.advance(Duration::from_secs(61));

    let readers = 16;
    let barrier = Arc::new(Barrier::new(readers));
    let handles: Vec<_> = (0..readers)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.read().unwrap()
            })
        })
        .collect();

    let snapshots: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(store.scans.load(Ordering::SeqCst), 2);
    assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(cache.stats().rebuilds, 2);
}

#[test]
fn test_concurrent_first_reads_rebuild_once() {
    let (store, _registry, _clock, cache) = setup();

    let readers = 8;
    let barrier = Arc::new(Barrier::new(readers));
    let handles: Vec<_> = (0..readers)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.read().map(|s| s.directive_count())
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap().unwrap(), 0);
    }
    assert_eq!(store.scans.load(Ordering::SeqCst), 1);
}

#[test]
fn test_invalidate_during_reads_is_observed() {
    let (_store, registry, _clock, cache) = setup();
    let d = registry.create("p", "s").unwrap();
    assert!(cache.read().unwrap().is_hidden("s"));

    registry.delete(&d.id).unwrap();
    cache.invalidate();

    let after = cache.read().unwrap();
    assert!(!after.is_hidden("s"));
    assert_eq!(after.generation(), 1);
}

#[test]
fn test_concurrent_reads_share_one_failed_rebuild() {
    let (store, registry, clock, cache) = setup();
    registry.create("p", "s").unwrap();
    let good = cache.read().unwrap();

    store.failing.store(true, Ordering::SeqCst);
    clock.advance(Duration::from_secs(61));

    let readers = 8;
    let barrier = Arc::new(Barrier::new(readers));
    let handles: Vec<_> = (0..readers)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.read().unwrap()
            })
        })
        .collect();

    for h in handles {
        assert!(Arc::ptr_eq(&good, &h.join().unwrap()));
    }
    assert_eq!(store.scans.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().stale_served, readers as u64);
}

#[test]
fn test_concurrent_reads_share_failure_without_snapshot() {
    let (store, _registry, _clock, cache) = setup();
    store.failing.store(true, Ordering::SeqCst);

    let readers = 8;
    let barrier = Arc::new(Barrier::new(readers));
    let handles: Vec<_> = (0..readers)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.read()
            })
        })
        .collect();

    for h in handles {
        let err = h.join().unwrap().unwrap_err();
        assert!(matches!(err, MergeError::StoreUnavailable(_)));
    }
    assert_eq!(store.scans.load(Ordering::SeqCst), 1);
}

#[test]
fn test_later_read_retries_after_failed_rebuild() {
    let (store, _registry, clock, cache) = setup();
    cache.read().unwrap();

    store.failing.store(true, Ordering::SeqCst);
    clock.advance(Duration::from_secs(61));
    cache.read().unwrap();

    store.failing.store(false, Ordering::SeqCst);
    cache.read().unwrap();

    assert_eq!(store.scans.load(Ordering::SeqCst), 3);
    assert_eq!(cache.stats().rebuilds, 2);
}
