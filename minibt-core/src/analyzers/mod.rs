//! Trade accounting: observers of engine events.
//!
//! Each analyzer is run-scoped: create fresh ones for every engine run. The
//! engine calls [`Analyzer::on_start`] once, then for every bar
//! [`Analyzer::on_trade_close`] (if a trade closed on that bar) followed by
//! [`Analyzer::on_bar`].

pub mod drawdown;
pub mod performance;
pub mod trade_log;

pub use drawdown::{DrawdownState, DrawdownTracker};
pub use performance::{PerformanceAnalyzer, PerformanceMetrics};
pub use trade_log::{write_entries_csv, TradeLog, TradeLogEntry};

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, BrokerState, Trade};

/// Observer of engine events. Every hook defaults to a no-op.
pub trait Analyzer {
    fn on_start(&mut self, _broker: &BrokerState) {}

    fn on_bar(&mut self, _bar: &Bar, _broker: &BrokerState) {}

    fn on_trade_close(&mut self, _trade: &Trade) {}
}

/// The three standard analyzers, fed together.
#[derive(Debug, Clone, Default)]
pub struct TradeAccountant {
    pub performance: PerformanceAnalyzer,
    pub drawdown: DrawdownTracker,
    pub trade_log: TradeLog,
}

/// Everything the accountant knows once a run has finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingSnapshot {
    pub performance: PerformanceMetrics,
    pub drawdown: DrawdownState,
    pub trade_log: Vec<TradeLogEntry>,
}

impl TradeAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finalize(self) -> AccountingSnapshot {
        AccountingSnapshot {
            performance: self.performance.finalize(),
            drawdown: self.drawdown.snapshot(),
            trade_log: self.trade_log.into_entries(),
        }
    }
}

impl Analyzer for TradeAccountant {
    fn on_start(&mut self, broker: &BrokerState) {
        self.performance.on_start(broker);
        self.drawdown.on_start(broker);
        self.trade_log.on_start(broker);
    }

    fn on_bar(&mut self, bar: &Bar, broker: &BrokerState) {
        self.performance.on_bar(bar, broker);
        self.drawdown.on_bar(bar, broker);
        self.trade_log.on_bar(bar, broker);
    }

    fn on_trade_close(&mut self, trade: &Trade) {
        self.performance.on_trade_close(trade);
        self.drawdown.on_trade_close(trade);
        self.trade_log.on_trade_close(trade);
    }
}

impl<A: Analyzer + ?Sized> Analyzer for &mut A {
    fn on_start(&mut self, broker: &BrokerState) {
        (**self).on_start(broker);
    }

    fn on_bar(&mut self, bar: &Bar, broker: &BrokerState) {
        (**self).on_bar(bar, broker);
    }

    fn on_trade_close(&mut self, trade: &Trade) {
        (**self).on_trade_close(trade);
    }
}

/// Analyzer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnalyzer;

impl Analyzer for NoAnalyzer {}
