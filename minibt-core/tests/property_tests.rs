//! Property tests for engine and analyzer invariants.
//!
//! Uses proptest to verify:
//! 1. Metric identities: profit_factor * gross_loss == gross_profit,
//!    avg_trade * trades == net PnL, wins + losses == trades
//! 2. Drawdown bounds: 0 <= max_pct <= 100 for positive equity
//! 3. Resampling: ceil(n / k) buckets, volume conserved, idempotent
//! 4. Equity identity: final equity == initial cash + sum of net PnL when flat

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use minibt_core::analyzers::{DrawdownTracker, NoAnalyzer, PerformanceMetrics};
use minibt_core::data::{Resampler, Timeframe};
use minibt_core::domain::{Bar, OrderIntent, Side, Trade, TradeId};
use minibt_core::engine::{EngineConfig, ExecutionEngine};
use minibt_core::strategy::{StrategyContext, StrategyError};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_pnl() -> impl Strategy<Value = f64> {
    (-500.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(50.0..150.0_f64, 1..max_len)
}

/// Bucket sizes (minutes) that divide the 09:00 session start.
fn arb_bucket() -> impl Strategy<Value = u32> {
    prop::sample::select(vec![1u32, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30, 60])
}

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 10, 1)
        .unwrap()
        .and_hms_opt(9, 1, 0)
        .unwrap()
}

fn minute_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(t0() + Duration::minutes(i as i64), c, c + 1.0, c - 1.0, c, 5.0))
        .collect()
}

fn trade_with_net(id: u64, net: f64) -> Trade {
    Trade {
        id: TradeId(id),
        direction: Side::Long,
        open_time: t0(),
        entry_bar: 0,
        entry_price: 100.0,
        close_time: t0(),
        exit_bar: 1,
        exit_price: 100.0,
        size: 1.0,
        gross_pnl: net,
        commission: 0.0,
        net_pnl: net,
    }
}

/// Alternates entry and exit every `every` bars.
struct Toggle {
    every: usize,
}

impl minibt_core::strategy::Strategy for Toggle {
    fn name(&self) -> &str {
        "toggle"
    }

    fn on_bar(
        &mut self,
        _bar: &Bar,
        ctx: &StrategyContext,
    ) -> Result<Option<OrderIntent>, StrategyError> {
        if ctx.bar_index() % self.every != 0 {
            return Ok(None);
        }
        Ok(Some(if ctx.has_position() {
            OrderIntent::Close
        } else {
            ctx.open_long()
        }))
    }
}

// ── 1. Metric identities ─────────────────────────────────────────────

proptest! {
    #[test]
    fn metric_identities_hold(pnls in prop::collection::vec(arb_pnl(), 1..60)) {
        let trades: Vec<Trade> = pnls
            .iter()
            .enumerate()
            .map(|(i, p)| trade_with_net(i as u64 + 1, *p))
            .collect();
        let m = PerformanceMetrics::from_trades(&trades);

        prop_assert_eq!(m.wins + m.losses, m.trades);
        prop_assert_eq!(m.trades, pnls.len());

        let net: f64 = pnls.iter().sum();
        prop_assert!((m.avg_trade * m.trades as f64 - net).abs() < 1e-6);

        if m.gross_loss > 0.0 {
            prop_assert!((m.profit_factor * m.gross_loss - m.gross_profit).abs() < 1e-6);
        } else if m.gross_profit > 0.0 {
            prop_assert!(m.profit_factor.is_infinite());
        }
        prop_assert!((m.expectancy - m.avg_trade).abs() < 1e-6);
    }
}

// ── 2. Drawdown bounds ───────────────────────────────────────────────

proptest! {
    #[test]
    fn drawdown_is_bounded(equity in prop::collection::vec(1.0..1e6_f64, 1..200)) {
        let mut tracker = DrawdownTracker::new();
        let mut peak = f64::MIN;
        for e in &equity {
            tracker.update(*e);
            peak = peak.max(*e);
            prop_assert!(tracker.max_pct() >= 0.0);
            prop_assert!(tracker.max_pct() <= 100.0);
            prop_assert!(tracker.max_cash() <= peak);
        }
    }
}

// ── 3. Resampling ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn resampling_bucket_count_and_volume(closes in arb_closes(400), k in arb_bucket()) {
        let bars = minute_bars(&closes);
        let resampler = Resampler::new(&bars, Some(Timeframe::from_minutes(k).unwrap()));
        let out: Vec<Bar> = resampler.iter().collect();

        let expected = (bars.len() + k as usize - 1) / k as usize;
        prop_assert_eq!(out.len(), expected);

        let vol_in: f64 = bars.iter().map(|b| b.volume).sum();
        let vol_out: f64 = out.iter().map(|b| b.volume).sum();
        prop_assert!((vol_in - vol_out).abs() < 1e-6);

        for pair in out.windows(2) {
            prop_assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn resampling_is_idempotent(closes in arb_closes(300), k in arb_bucket()) {
        let bars = minute_bars(&closes);
        let tf = Timeframe::from_minutes(k).unwrap();
        let once: Vec<Bar> = Resampler::new(&bars, Some(tf)).iter().collect();
        let twice: Vec<Bar> = Resampler::new(&once, Some(tf)).iter().collect();
        prop_assert_eq!(once, twice);
    }
}

// ── 4. Equity identity ───────────────────────────────────────────────

proptest! {
    #[test]
    fn flat_equity_equals_cash_plus_net_pnl(closes in arb_closes(200), every in 1usize..7) {
        let engine = ExecutionEngine::new(EngineConfig::default()).unwrap();
        let result = engine
            .run(minute_bars(&closes), &mut Toggle { every }, &mut NoAnalyzer)
            .unwrap();

        let net: f64 = result.trades.iter().map(|t| t.net_pnl).sum();
        prop_assert!((result.final_broker.cash - (100_000.0 + net)).abs() < 1e-6);
        if result.open_position.is_none() {
            prop_assert!((result.final_equity() - result.final_broker.cash).abs() < 1e-9);
        }
        for t in &result.trades {
            prop_assert!((t.commission - 1.24).abs() < 1e-12);
            prop_assert!(t.exit_bar > t.entry_bar);
        }
    }
}
