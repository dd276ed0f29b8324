//! DrawdownTracker: running peak-to-trough decline of account equity.
//!
//! Percentages are in percent units (12.5 means 12.5%), measured against the
//! running peak. A non-positive peak reports 0%.

use serde::{Deserialize, Serialize};

use super::Analyzer;
use crate::domain::{Bar, BrokerState};

#[derive(Debug, Clone, Default)]
pub struct DrawdownTracker {
    peak: f64,
    current_pct: f64,
    current_cash: f64,
    max_pct: f64,
    max_cash: f64,
    seeded: bool,
}

/// Drawdown figures at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownState {
    pub peak_equity: f64,
    pub current_pct: f64,
    pub current_cash: f64,
    pub max_pct: f64,
    pub max_cash: f64,
}

impl DrawdownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker whose peak starts at `equity` (typically the initial cash).
    pub fn starting_at(equity: f64) -> Self {
        let mut tracker = Self::new();
        tracker.update(equity);
        tracker
    }

    /// Fold one equity observation into the running figures.
    pub fn update(&mut self, equity: f64) {
        if !self.seeded || equity > self.peak {
            self.peak = equity;
            self.seeded = true;
        }

        self.current_cash = self.peak - equity;
        self.current_pct = if self.peak > 0.0 {
            self.current_cash / self.peak * 100.0
        } else {
            0.0
        };

        self.max_cash = self.max_cash.max(self.current_cash);
        self.max_pct = self.max_pct.max(self.current_pct);
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn max_pct(&self) -> f64 {
        self.max_pct
    }

    pub fn max_cash(&self) -> f64 {
        self.max_cash
    }

    pub fn snapshot(&self) -> DrawdownState {
        DrawdownState {
            peak_equity: self.peak,
            current_pct: self.current_pct,
            current_cash: self.current_cash,
            max_pct: self.max_pct,
            max_cash: self.max_cash,
        }
    }
}

impl Analyzer for DrawdownTracker {
    fn on_start(&mut self, broker: &BrokerState) {
        self.update(broker.equity);
    }

    fn on_bar(&mut self, _bar: &Bar, broker: &BrokerState) {
        self.update(broker.equity);
    }
}
