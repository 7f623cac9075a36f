//! Matching engine benchmarks.
//!
//! Run with: cargo bench -p pulse-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pulse_core::{
    MatchingEngine, Order, OrderBook, OrderId, OrderType, Price, Quantity, Side, SymbolId,
    TimeInForce,
};

fn engine() -> MatchingEngine {
    MatchingEngine::with_book(OrderBook::with_capacity(1 << 20))
}

fn limit(id: u64, side: Side, ticks: u64, qty: u32) -> Order {
    Order::new(
        OrderId(id),
        SymbolId(1),
        side,
        OrderType::Limit,
        TimeInForce::Gtc,
        Price::from_ticks(ticks),
        Quantity(qty),
    )
}

fn ioc(id: u64, side: Side, ticks: u64, qty: u32) -> Order {
    Order::new(
        OrderId(id),
        SymbolId(1),
        side,
        OrderType::Limit,
        TimeInForce::Ioc,
        Price::from_ticks(ticks),
        Quantity(qty),
    )
}

/// Insert into an empty book.
fn bench_insert_empty(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_empty");
    group.throughput(Throughput::Elements(1));

    group.bench_function("limit_order", |b| {
        let mut eng = engine();
        let mut id = 0u64;

        b.iter(|| {
            id += 1;
            black_box(eng.submit_order(limit(id, Side::Buy, 10_000, 100)))
        })
    });

    group.finish();
}

/// Insert into a book with existing depth.
fn bench_insert_deep_book(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_deep_book");
    group.throughput(Throughput::Elements(1));

    for depth in [100u64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut eng = engine();
            for i in 0..depth {
                eng.submit_order(limit(i + 1, Side::Sell, 10_100 + (i % 100), 100));
            }
            let mut id = depth;

            b.iter(|| {
                id += 1;
                black_box(eng.submit_order(limit(id, Side::Buy, 10_000, 100)))
            })
        });
    }

    group.finish();
}

/// Aggressive orders consuming resting liquidity.
fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ioc_against_depth", |b| {
        let mut eng = engine();
        for i in 0..100_000u64 {
            eng.submit_order(limit(i + 1, Side::Sell, 10_100 + (i % 50), 100));
        }
        let mut id = 100_000u64;

        b.iter(|| {
            id += 1;
            let result = eng.submit_order(ioc(id, Side::Buy, 10_200, 50));
            eng.drain_trades();
            black_box(result)
        })
    });

    group.finish();
}

/// Mixed passive/aggressive flow.
fn bench_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_workload");
    group.throughput(Throughput::Elements(1));

    group.bench_function("70_20_10", |b| {
        let mut eng = engine();
        let mut id = 0u64;

        b.iter(|| {
            id += 1;
            let order = match id % 10 {
                0..=6 => limit(id, Side::Buy, 10_000 + (id % 50), 100),
                7..=8 => limit(id, Side::Sell, 10_060 + (id % 50), 100),
                _ => ioc(id, Side::Buy, 10_200, 50),
            };
            let result = eng.submit_order(order);
            eng.drain_trades();
            black_box(result)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_empty,
    bench_insert_deep_book,
    bench_matching,
    bench_mixed
);
criterion_main!(benches);
