//! Ring buffer benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pulse_ring::SpscRing;

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer");
    group.throughput(Throughput::Elements(1));

    group.bench_function("try_push_try_pop", |b| {
        let ring: SpscRing<u64, 1024> = SpscRing::new();
        let (mut tx, mut rx) = ring.split();

        b.iter(|| {
            black_box(tx.try_push(42).is_ok());
            black_box(rx.try_pop());
        })
    });

    group.finish();
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_throughput");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("10k_messages", |b| {
        b.iter_batched(
            || SpscRing::<u64, 16384>::new(),
            |ring| {
                let (mut tx, mut rx) = ring.split();
                for i in 0..10_000u64 {
                    tx.push(i);
                }
                for _ in 0..10_000 {
                    black_box(rx.pop());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_throughput);
criterion_main!(benches);
