//! Comparison benchmarks against `hashbrown` on aggregation-shaped
//! workloads: monotonic and random u64 keys, counting and lookup loops.

use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::hint::black_box;

const N: usize = 100_000;

fn random_keys(distinct: u64) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(0x9e37_79b9);
    (0..N).map(|_| rng.random_range(0..distinct)).collect()
}

fn bench_count_aggregation(c: &mut Criterion) {
    // GROUP BY count(*): every key hits `map[k] += 1`.
    let keys = random_keys(1 << 14);

    let mut group = c.benchmark_group("count_aggregation");
    group.bench_function("probe_hash", |b| {
        b.iter(|| {
            let mut map: probe_hash::HashMap<u64, u64> = probe_hash::HashMap::new();
            for &k in &keys {
                *map.get_or_default(black_box(k)) += 1;
            }
            black_box(map.len())
        })
    });
    group.bench_function("probe_hash_saved_hash", |b| {
        b.iter(|| {
            let mut map: probe_hash::HashMapWithSavedHash<u64, u64> =
                probe_hash::HashMapWithSavedHash::new();
            for &k in &keys {
                *map.get_or_default(black_box(k)) += 1;
            }
            black_box(map.len())
        })
    });
    group.bench_function("hashbrown", |b| {
        b.iter(|| {
            let mut map: hashbrown::HashMap<u64, u64> = hashbrown::HashMap::new();
            for &k in &keys {
                *map.entry(black_box(k)).or_insert(0) += 1;
            }
            black_box(map.len())
        })
    });
    group.finish();
}

fn bench_insert_distinct(c: &mut Criterion) {
    // Join build side: all keys distinct, table grows through resizes.
    let keys: Vec<u64> = (0..N as u64).map(|k| k.wrapping_mul(0x9e37_79b9)).collect();

    let mut group = c.benchmark_group("insert_distinct");
    group.bench_function("probe_hash", |b| {
        b.iter(|| {
            let mut map: probe_hash::HashMap<u64, u64> = probe_hash::HashMap::new();
            for &k in &keys {
                map.insert(black_box(k), k);
            }
            black_box(map.len())
        })
    });
    group.bench_function("probe_hash_presized", |b| {
        b.iter(|| {
            let mut map: probe_hash::HashMap<u64, u64> = probe_hash::HashMap::with_capacity(N);
            for &k in &keys {
                map.insert(black_box(k), k);
            }
            black_box(map.len())
        })
    });
    group.bench_function("hashbrown", |b| {
        b.iter(|| {
            let mut map: hashbrown::HashMap<u64, u64> = hashbrown::HashMap::new();
            for &k in &keys {
                map.insert(black_box(k), k);
            }
            black_box(map.len())
        })
    });
    group.finish();
}

fn bench_lookup_hit(c: &mut Criterion) {
    let keys = random_keys(1 << 16);

    let mut probe: probe_hash::HashMap<u64, u64> = probe_hash::HashMap::new();
    let mut brown: hashbrown::HashMap<u64, u64> = hashbrown::HashMap::new();
    for &k in &keys {
        probe.insert(k, k);
        brown.insert(k, k);
    }

    let mut group = c.benchmark_group("lookup_hit");
    group.bench_function("probe_hash", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for &k in &keys {
                if let Some(v) = probe.get(black_box(k)) {
                    sum = sum.wrapping_add(*v);
                }
            }
            black_box(sum)
        })
    });
    group.bench_function("hashbrown", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for &k in &keys {
                if let Some(v) = brown.get(&black_box(k)) {
                    sum = sum.wrapping_add(*v);
                }
            }
            black_box(sum)
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_count_aggregation,
    bench_insert_distinct,
    bench_lookup_hit
);
criterion_main!(benches);
