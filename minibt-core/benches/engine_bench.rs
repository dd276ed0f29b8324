//! Criterion benchmarks for MiniBT hot paths.
//!
//! Benchmarks:
//! 1. Bar loop (sma_test over 1-minute bars with all analyzers)
//! 2. Resampling (1-minute bars to 5/15/60 minutes)
//! 3. Streaming SMA updates

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use minibt_core::analyzers::TradeAccountant;
use minibt_core::data::{Resampler, Timeframe};
use minibt_core::domain::Bar;
use minibt_core::engine::{EngineConfig, ExecutionEngine};
use minibt_core::indicators::Sma;
use minibt_core::strategy::{SmaTest, SmaTestParams};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 10, 1)
        .unwrap()
        .and_hms_opt(9, 1, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 5000.0 + (i as f64 * 0.05).sin() * 40.0;
            Bar::new(
                start + chrono::Duration::minutes(i as i64),
                close - 0.5,
                close + 2.0,
                close - 2.0,
                close,
                100.0 + (i % 50) as f64,
            )
        })
        .collect()
}

// ── 1. Bar loop ──────────────────────────────────────────────────────

fn bench_bar_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_loop");
    let engine = ExecutionEngine::new(EngineConfig::default()).unwrap();

    for &bar_count in &[1_000, 10_000, 100_000] {
        let bars = make_bars(bar_count);
        group.bench_with_input(BenchmarkId::new("sma_test", bar_count), &bars, |b, bars| {
            b.iter(|| {
                let mut strategy = SmaTest::new(SmaTestParams::default());
                let mut accountant = TradeAccountant::new();
                let result = engine
                    .run(black_box(bars).iter().cloned(), &mut strategy, &mut accountant)
                    .unwrap();
                black_box((result, accountant.finalize()))
            });
        });
    }

    group.finish();
}

// ── 2. Resampling ────────────────────────────────────────────────────

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    let bars = make_bars(100_000);

    for &minutes in &[5u32, 15, 60] {
        let tf = Timeframe::from_minutes(minutes).unwrap();
        group.bench_with_input(BenchmarkId::new("100k_1m", minutes), &tf, |b, tf| {
            b.iter(|| {
                let resampler = Resampler::new(black_box(&bars), Some(*tf));
                black_box(resampler.iter().count())
            });
        });
    }

    group.finish();
}

// ── 3. Streaming SMA ─────────────────────────────────────────────────

fn bench_sma(c: &mut Criterion) {
    let closes: Vec<f64> = make_bars(100_000).iter().map(|b| b.close).collect();

    c.bench_function("sma_30_update_100k", |b| {
        b.iter(|| {
            let mut sma = Sma::new(30);
            let mut last = None;
            for &close in black_box(&closes) {
                last = sma.update(close);
            }
            black_box(last)
        });
    });
}

criterion_group!(benches, bench_bar_loop, bench_resample, bench_sma);
criterion_main!(benches);
