//! Ladder Pricing Benchmarks — Per-Cycle Arithmetic
//!
//! Benchmarks the domain functions every cycle runs: tick rounding,
//! buy/sell price derivation and tracked-set pruning.
//!
//! Run with: cargo bench --bench pricing_bench

use std::collections::HashSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

use ladder_bot::domain::books::{ExecutedBuys, TrackedBuys};
use ladder_bot::domain::pricing::{LadderPricing, TickRounding, TickSize};

/// Benchmark tick rounding on a fine tick.
fn bench_tick_round(c: &mut Criterion) {
    let tick = TickSize::new(Decimal::new(1, 2)).unwrap();
    let price = Decimal::new(6_543_217_891, 5);

    c.bench_function("tick_round_half_even", |b| {
        b.iter(|| tick.round(black_box(price), TickRounding::HalfEven));
    });
}

/// Benchmark one buy and one sell price derivation.
fn bench_ladder_prices(c: &mut Criterion) {
    let tick = TickSize::new(Decimal::new(1, 1)).unwrap();
    let pricing = LadderPricing::new(tick, Decimal::new(25, 1), TickRounding::HalfEven);
    let market = Decimal::new(5_012_345, 2);

    c.bench_function("ladder_buy_and_sell_price", |b| {
        b.iter(|| {
            let buy = pricing.buy_price(black_box(market));
            let sell = buy.and_then(|p| pricing.sell_price(black_box(p)));
            (buy, sell)
        });
    });
}

/// Benchmark pruning a 100-rung ladder where half the buys filled.
fn bench_prune_converted(c: &mut Criterion) {
    let ids: Vec<String> = (0..100).map(|i| format!("order-{i}")).collect();
    let mut executed = ExecutedBuys::new();
    for id in ids.iter().step_by(2) {
        executed.mark(id);
    }
    let open: HashSet<&str> = ids.iter().skip(1).step_by(2).map(String::as_str).collect();

    c.bench_function("prune_converted_100", |b| {
        b.iter_batched(
            || {
                let mut tracked = TrackedBuys::new();
                for id in &ids {
                    tracked.insert(id.clone(), Decimal::ONE);
                }
                tracked
            },
            |mut tracked| tracked.prune_converted(black_box(&open), &executed),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_tick_round,
    bench_ladder_prices,
    bench_prune_converted,
);
criterion_main!(benches);
