//! Benchmarks comparing ObjectPool slot churn against Box allocation.
//!
//! Run with: cargo bench -p duplex-pool

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use duplex_pool::{ObjectPool, PoolBuilder};

const COUNT: usize = 10_000;

fn warm_pool() -> ObjectPool {
    let mut pool = PoolBuilder::for_type::<[u64; 4]>().chunk_size(256).build().unwrap();
    let ids: Vec<_> = (0..COUNT).map(|_| pool.alloc()).collect();
    for id in ids {
        pool.free(id);
    }
    pool
}

fn bench_alloc_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free");
    group.throughput(Throughput::Elements(COUNT as u64));

    let mut pool = warm_pool();
    let mut ids = Vec::with_capacity(COUNT);

    group.bench_function("object-pool", |b| {
        b.iter(|| {
            for _ in 0..COUNT {
                ids.push(black_box(pool.alloc()));
            }
            for id in ids.drain(..) {
                pool.free(id);
            }
        });
    });

    let mut boxes = Vec::with_capacity(COUNT);

    group.bench_function("box", |b| {
        b.iter(|| {
            for i in 0..COUNT {
                boxes.push(black_box(Box::new([i as u64; 4])));
            }
            boxes.clear();
        });
    });

    group.finish();
    pool.dry_up();
}

fn bench_cold_carve(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_carve");
    group.throughput(Throughput::Elements(COUNT as u64));

    group.bench_function("object-pool", |b| {
        b.iter(|| {
            let mut pool = PoolBuilder::for_type::<[u64; 4]>().build().unwrap();
            for _ in 0..COUNT {
                black_box(pool.alloc());
            }
            pool.dry_up();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_alloc_free, bench_cold_carve);
criterion_main!(benches);
