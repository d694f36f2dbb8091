use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use hashsmith::ConcurrentSwissMap;

#[test]
fn disjoint_writers_reach_exact_size() {
    // Eight writers, each inserting a disjoint range of 10,000 keys.
    let map: Arc<ConcurrentSwissMap<u64, u64>> =
        Arc::new(ConcurrentSwissMap::with_options(16, 16, 0.875));
    let n_threads = 8u64;
    let per_thread = 10_000u64;
    let barrier = Arc::new(Barrier::new(n_threads as usize));

    let mut handles = Vec::new();
    for t in 0..n_threads {
        let b = barrier.clone();
        let map = map.clone();
        handles.push(thread::spawn(move || {
            b.wait();
            let base = t * per_thread;
            for k in base..base + per_thread {
                assert_eq!(map.insert(k, k), None);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(map.len(), (n_threads * per_thread) as usize);
    for k in 0..n_threads * per_thread {
        assert_eq!(map.get(&k), Some(k), "key {k} lost");
    }

    let mut keys: Vec<u64> = map.snapshot().map(|(k, _)| k).collect();
    assert_eq!(keys.len(), (n_threads * per_thread) as usize);
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), (n_threads * per_thread) as usize);
}

#[test]
fn readers_race_writers_without_torn_values() {
    // Writers continuously overwrite a fixed key space while readers spin
    // on gets; every observed value must be one some writer actually
    // stored for that key.
    let map: Arc<ConcurrentSwissMap<u64, u64>> = Arc::new(ConcurrentSwissMap::new());
    let key_space = 128u64;
    for k in 0..key_space {
        map.insert(k, k << 32 | k);
    }

    let stop = Arc::new(AtomicU64::new(0));
    let mut handles = Vec::new();

    for _ in 0..2 {
        let map = map.clone();
        let stop = stop.clone();
        handles.push(thread::spawn(move || {
            let mut round = 1u64;
            while stop.load(Ordering::Relaxed) == 0 {
                for k in 0..key_space {
                    map.insert(k, (k + round) << 32 | k);
                }
                round += 1;
            }
        }));
    }

    for _ in 0..4 {
        let map = map.clone();
        let stop = stop.clone();
        handles.push(thread::spawn(move || {
            while stop.load(Ordering::Relaxed) == 0 {
                for k in 0..key_space {
                    if let Some(v) = map.get(&k) {
                        // The low half always encodes the key itself.
                        assert_eq!(v & 0xFFFF_FFFF, k, "torn or foreign value for key {k}");
                    }
                }
            }
        }));
    }

    thread::sleep(std::time::Duration::from_millis(300));
    stop.store(1, Ordering::Relaxed);
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn mixed_put_remove_converges() {
    // Concurrent puts and removes over a fixed key space; at quiescence
    // the snapshot must agree with point lookups.
    let map: Arc<ConcurrentSwissMap<u64, u64>> =
        Arc::new(ConcurrentSwissMap::with_options(8, 64, 0.875));
    let n_threads = 6;
    let iters = 20_000u64;
    let key_space = 512u64;
    let barrier = Arc::new(Barrier::new(n_threads));

    let mut handles = Vec::new();
    for t in 0..n_threads as u64 {
        let b = barrier.clone();
        let map = map.clone();
        handles.push(thread::spawn(move || {
            b.wait();
            for i in 0..iters {
                let k = (i.wrapping_mul(2_654_435_761).wrapping_add(t)) % key_space;
                if (i + t) % 3 == 0 {
                    map.remove(&k);
                } else {
                    map.insert(k, k * 1000);
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let entries: Vec<(u64, u64)> = map.snapshot().collect();
    let mut keys: Vec<u64> = entries.iter().map(|(k, _)| *k).collect();
    keys.sort_unstable();
    let distinct = {
        let mut k = keys.clone();
        k.dedup();
        k.len()
    };
    assert_eq!(distinct, keys.len(), "snapshot yielded a duplicate key");
    assert_eq!(entries.len(), map.len());

    for (k, v) in entries {
        assert_eq!(v, k * 1000);
        assert!(map.contains_key(&k));
        assert_eq!(map.get(&k), Some(v));
    }
}

#[test]
fn deletion_heavy_shards_rebuild_under_contention() {
    // Every thread inserts then deletes most of its range, forcing
    // tombstone-driven rebuilds inside shards while other threads read.
    let map: Arc<ConcurrentSwissMap<u64, u64>> =
        Arc::new(ConcurrentSwissMap::with_options(4, 16, 0.875));
    let n_threads = 4u64;
    let per_thread = 4_000u64;
    let barrier = Arc::new(Barrier::new(n_threads as usize));

    let mut handles = Vec::new();
    for t in 0..n_threads {
        let b = barrier.clone();
        let map = map.clone();
        handles.push(thread::spawn(move || {
            b.wait();
            let base = t * per_thread;
            for k in base..base + per_thread {
                map.insert(k, k);
            }
            for k in base..base + (per_thread * 9 / 10) {
                assert_eq!(map.remove(&k), Some(k));
            }
            // Survivors must still be visible through the rebuilds.
            for k in base + (per_thread * 9 / 10)..base + per_thread {
                assert_eq!(map.get(&k), Some(k));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let expected = (n_threads * per_thread / 10) as usize;
    assert_eq!(map.len(), expected);
}

#[test]
fn bulk_insert_races_point_writes() {
    let map: Arc<ConcurrentSwissMap<u64, u64>> = Arc::new(ConcurrentSwissMap::new());
    let barrier = Arc::new(Barrier::new(3));

    let bulk = {
        let map = map.clone();
        let b = barrier.clone();
        thread::spawn(move || {
            b.wait();
            map.insert_all((0..10_000u64).map(|k| (k, 1)));
        })
    };
    let points: Vec<_> = (0..2)
        .map(|t| {
            let map = map.clone();
            let b = barrier.clone();
            thread::spawn(move || {
                b.wait();
                for k in (10_000 + t * 5_000)..(10_000 + (t + 1) * 5_000) {
                    map.insert(k, 1);
                }
            })
        })
        .collect();

    bulk.join().unwrap();
    for h in points {
        h.join().unwrap();
    }

    assert_eq!(map.len(), 20_000);
    for k in (0..20_000u64).step_by(499) {
        assert_eq!(map.get(&k), Some(1));
    }
}
