//! Benchmark for PersistentIntMap vs standard BTreeMap and HashMap.
//!
//! Compares clustered writes (which stay in the staging leaf), scattered
//! writes (which switch blocks on every call), lookups and bulk removal.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use persistent_intmap::persistent::PersistentIntMap;
use std::collections::{BTreeMap, HashMap};
use std::hint::black_box;

/// Spreads consecutive indices over distinct 32-key blocks.
const fn scattered_key(index: i32) -> i32 {
    index.wrapping_mul(0x9E37_79B1_u32.cast_signed())
}

// =============================================================================
// Clustered insert Benchmark
// =============================================================================

fn benchmark_clustered_insert(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("clustered_insert");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("PersistentIntMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut map = PersistentIntMap::new();
                    for key in 0..size {
                        map = map.insert(black_box(key), black_box(key * 2));
                    }
                    black_box(map)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut map = BTreeMap::new();
                for key in 0..size {
                    map.insert(black_box(key), black_box(key * 2));
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

// =============================================================================
// Scattered insert Benchmark
// =============================================================================

fn benchmark_scattered_insert(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("scattered_insert");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("PersistentIntMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut map = PersistentIntMap::new();
                    for index in 0..size {
                        map = map.insert(black_box(scattered_key(index)), black_box(index));
                    }
                    black_box(map)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("HashMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut map = HashMap::new();
                for index in 0..size {
                    map.insert(black_box(scattered_key(index)), black_box(index));
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

// =============================================================================
// get Benchmark
// =============================================================================

fn benchmark_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("get");

    for size in [1_000, 10_000, 100_000] {
        let persistent: PersistentIntMap<i32> =
            (0..size).map(|index| (scattered_key(index), index)).collect();
        let standard: HashMap<i32, i32> = (0..size).map(|index| (scattered_key(index), index)).collect();

        group.bench_with_input(
            BenchmarkId::new("PersistentIntMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut sum = 0i64;
                    for index in 0..size {
                        if let Some(value) = persistent.get(black_box(scattered_key(index))) {
                            sum += i64::from(*value);
                        }
                    }
                    black_box(sum)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("HashMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut sum = 0i64;
                for index in 0..size {
                    if let Some(value) = standard.get(&black_box(scattered_key(index))) {
                        sum += i64::from(*value);
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

// =============================================================================
// iter Benchmark
// =============================================================================

fn benchmark_iter(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("iter");

    for size in [1_000, 10_000, 100_000] {
        let persistent: PersistentIntMap<i32> = (0..size).map(|index| (index, index)).collect();

        group.bench_with_input(
            BenchmarkId::new("PersistentIntMap", size),
            &size,
            |bencher, _| {
                bencher.iter(|| black_box(persistent.iter().map(|value| i64::from(*value)).sum::<i64>()));
            },
        );
    }

    group.finish();
}

// =============================================================================
// remove_all_satisfying Benchmark
// =============================================================================

fn benchmark_remove_all_satisfying(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("remove_all_satisfying");

    for size in [1_000, 10_000, 100_000] {
        let persistent: PersistentIntMap<i32> = (0..size).map(|index| (index, index)).collect();

        group.bench_with_input(
            BenchmarkId::new("PersistentIntMap/half", size),
            &size,
            |bencher, _| {
                bencher.iter(|| black_box(persistent.remove_all_satisfying(|value| value % 2 == 0)));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("PersistentIntMap/none", size),
            &size,
            |bencher, _| {
                bencher.iter(|| black_box(persistent.remove_all_satisfying(|_| false)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_clustered_insert,
    benchmark_scattered_insert,
    benchmark_get,
    benchmark_iter,
    benchmark_remove_all_satisfying
);

criterion_main!(benches);
