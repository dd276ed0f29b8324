//! PerformanceAnalyzer: trade-count based statistics.
//!
//! A trade with net PnL > 0 is a win; anything else (including exactly zero)
//! counts as a loss. Gross profit and gross loss sum *net* PnL, so commission
//! is already reflected in every ratio.

use serde::{Deserialize, Serialize};

use super::Analyzer;
use crate::domain::Trade;

/// Accumulator fed by trade-close events.
#[derive(Debug, Clone, Default)]
pub struct PerformanceAnalyzer {
    trades: usize,
    wins: usize,
    losses: usize,
    gross_profit: f64,
    gross_loss: f64,
}

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trade: &Trade) {
        self.trades += 1;
        if trade.net_pnl > 0.0 {
            self.wins += 1;
            self.gross_profit += trade.net_pnl;
        } else {
            self.losses += 1;
            self.gross_loss += trade.net_pnl.abs();
        }
    }

    pub fn trades(&self) -> usize {
        self.trades
    }

    pub fn finalize(&self) -> PerformanceMetrics {
        PerformanceMetrics::from_totals(
            self.trades,
            self.wins,
            self.losses,
            self.gross_profit,
            self.gross_loss,
        )
    }
}

impl Analyzer for PerformanceAnalyzer {
    fn on_trade_close(&mut self, trade: &Trade) {
        self.record(trade);
    }
}

/// Read-only run snapshot.
///
/// Zero-denominator fallbacks:
/// - no trades: every ratio is 0.0
/// - gross loss 0 with gross profit > 0: `profit_factor` is +inf
/// - no wins (or no losses): that side's average is 0.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(with = "ratio_serde")]
    pub profit_factor: f64,
    pub avg_trade: f64,
    pub expectancy: f64,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
}

impl PerformanceMetrics {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut analyzer = PerformanceAnalyzer::new();
        for t in trades {
            analyzer.record(t);
        }
        analyzer.finalize()
    }

    fn from_totals(
        trades: usize,
        wins: usize,
        losses: usize,
        gross_profit: f64,
        gross_loss: f64,
    ) -> Self {
        if trades == 0 {
            return Self::empty();
        }
        let n = trades as f64;

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let win_rate = wins as f64 / n;
        let loss_rate = losses as f64 / n;
        let avg_win = if wins > 0 { gross_profit / wins as f64 } else { 0.0 };
        let avg_loss = if losses > 0 { gross_loss / losses as f64 } else { 0.0 };

        Self {
            profit_factor,
            avg_trade: (gross_profit - gross_loss) / n,
            expectancy: win_rate * avg_win - loss_rate * avg_loss,
            trades,
            wins,
            losses,
            gross_profit,
            gross_loss,
        }
    }

    /// Snapshot for a run that closed no trades.
    pub fn empty() -> Self {
        Self {
            profit_factor: 0.0,
            avg_trade: 0.0,
            expectancy: 0.0,
            trades: 0,
            wins: 0,
            losses: 0,
            gross_profit: 0.0,
            gross_loss: 0.0,
        }
    }

    /// `wins / trades * 100`, 0 when there are no trades.
    pub fn win_rate_pct(&self) -> f64 {
        if self.trades == 0 {
            return 0.0;
        }
        self.wins as f64 / self.trades as f64 * 100.0
    }
}

/// JSON has no infinity; store it as the string `"inf"`.
mod ratio_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            s.serialize_str("inf")
        } else {
            s.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) if s == "inf" => Ok(f64::INFINITY),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "expected number or \"inf\", got '{s}'"
            ))),
        }
    }
}
