use core::hint::black_box;
use std::sync::Arc;
use std::thread;

use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use criterion::Throughput;
use hashbrown::HashMap as HashbrownMap;
use hashsmith::ConcurrentSwissMap;
use hashsmith::SwissMap;
use rand::rngs::OsRng;
use rand::TryRngCore;

const SIZES: &[usize] = &[
    ((1 << 10) as f32 * 0.87) as usize,
    ((1 << 15) as f32 * 0.87) as usize,
    ((1 << 19) as f32 * 0.87) as usize,
];

fn keys(size: usize) -> Vec<u64> {
    let mut rng = OsRng;
    (0..size).map(|_| rng.try_next_u64().unwrap()).collect()
}

fn bench_insert_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_sequential");

    for size in SIZES.iter() {
        let keys = keys(*size);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_function(format!("swiss/{}", size), |b| {
            b.iter(|| {
                let mut map = SwissMap::with_capacity(16);
                for &k in &keys {
                    map.insert(k, k);
                }
                black_box(map)
            })
        });
        group.bench_function(format!("swiss_preallocated/{}", size), |b| {
            b.iter(|| {
                let mut map = SwissMap::with_capacity(*size * 2);
                for &k in &keys {
                    map.insert(k, k);
                }
                black_box(map)
            })
        });
        group.bench_function(format!("std/{}", size), |b| {
            b.iter(|| {
                let mut map = std::collections::HashMap::new();
                for &k in &keys {
                    map.insert(k, k);
                }
                black_box(map)
            })
        });
        group.bench_function(format!("hashbrown/{}", size), |b| {
            b.iter(|| {
                let mut map = HashbrownMap::new();
                for &k in &keys {
                    map.insert(k, k);
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

fn bench_lookup_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_hit");

    for size in SIZES.iter() {
        let keys = keys(*size);
        group.throughput(Throughput::Elements(*size as u64));

        let swiss: SwissMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        group.bench_function(format!("swiss/{}", size), |b| {
            b.iter(|| {
                for k in &keys {
                    black_box(swiss.get(k));
                }
            })
        });

        let std_map: std::collections::HashMap<u64, u64> =
            keys.iter().map(|&k| (k, k)).collect();
        group.bench_function(format!("std/{}", size), |b| {
            b.iter(|| {
                for k in &keys {
                    black_box(std_map.get(k));
                }
            })
        });

        let brown: HashbrownMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        group.bench_function(format!("hashbrown/{}", size), |b| {
            b.iter(|| {
                for k in &keys {
                    black_box(brown.get(k));
                }
            })
        });
    }

    group.finish();
}

fn bench_lookup_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_miss");

    for size in SIZES.iter() {
        let keys = keys(*size);
        let misses: Vec<u64> = keys.iter().map(|k| k.wrapping_add(1)).collect();
        group.throughput(Throughput::Elements(*size as u64));

        let swiss: SwissMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        group.bench_function(format!("swiss/{}", size), |b| {
            b.iter(|| {
                for k in &misses {
                    black_box(swiss.get(k));
                }
            })
        });

        let brown: HashbrownMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        group.bench_function(format!("hashbrown/{}", size), |b| {
            b.iter(|| {
                for k in &misses {
                    black_box(brown.get(k));
                }
            })
        });
    }

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_remove_churn");

    for size in SIZES.iter().take(2) {
        let keys = keys(*size);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_function(format!("swiss/{}", size), |b| {
            b.iter(|| {
                let mut map = SwissMap::with_capacity(16);
                for &k in &keys {
                    map.insert(k, k);
                }
                for &k in &keys {
                    black_box(map.remove(&k));
                }
                black_box(map)
            })
        });

        group.bench_function(format!("hashbrown/{}", size), |b| {
            b.iter(|| {
                let mut map = HashbrownMap::new();
                for &k in &keys {
                    map.insert(k, k);
                }
                for &k in &keys {
                    black_box(map.remove(&k));
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

fn bench_concurrent_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_get");
    let size = SIZES[1];
    let keys = keys(size);

    let map: Arc<ConcurrentSwissMap<u64, u64>> = Arc::new(ConcurrentSwissMap::new());
    for &k in &keys {
        map.insert(k, k);
    }

    for threads in [1usize, 4, 8] {
        group.throughput(Throughput::Elements((size * threads) as u64));
        group.bench_function(format!("swiss_concurrent/{}threads", threads), |b| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let map = Arc::clone(&map);
                        let keys = keys.clone();
                        thread::spawn(move || {
                            for k in &keys {
                                black_box(map.get(k));
                            }
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_sequential,
    bench_lookup_hit,
    bench_lookup_miss,
    bench_churn,
    bench_concurrent_get
);
criterion_main!(benches);
