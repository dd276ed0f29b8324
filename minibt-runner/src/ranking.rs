//! Metrics a batch table can be ranked by.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::RowMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    #[default]
    EquityFinal,
    ProfitFactor,
    AvgTrade,
    Expectancy,
    Trades,
    Wins,
    Losses,
    WinRate,
    MaxDdPct,
    MaxDdCash,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown ranking metric '{name}' (available: {available})")]
pub struct UnknownMetric {
    pub name: String,
    pub available: String,
}

impl RankMetric {
    pub const ALL: [RankMetric; 10] = [
        RankMetric::EquityFinal,
        RankMetric::ProfitFactor,
        RankMetric::AvgTrade,
        RankMetric::Expectancy,
        RankMetric::Trades,
        RankMetric::Wins,
        RankMetric::Losses,
        RankMetric::WinRate,
        RankMetric::MaxDdPct,
        RankMetric::MaxDdCash,
    ];

    /// Canonical snake_case name.
    pub fn name(&self) -> &'static str {
        match self {
            RankMetric::EquityFinal => "equity_final",
            RankMetric::ProfitFactor => "profit_factor",
            RankMetric::AvgTrade => "avg_trade",
            RankMetric::Expectancy => "expectancy",
            RankMetric::Trades => "trades",
            RankMetric::Wins => "wins",
            RankMetric::Losses => "losses",
            RankMetric::WinRate => "win_rate",
            RankMetric::MaxDdPct => "max_dd_pct",
            RankMetric::MaxDdCash => "max_dd_cash",
        }
    }

    /// Column title in printed tables.
    pub fn title(&self) -> &'static str {
        match self {
            RankMetric::EquityFinal => "Equity Final",
            RankMetric::ProfitFactor => "Profit Factor",
            RankMetric::AvgTrade => "Avg Trade",
            RankMetric::Expectancy => "Expectancy",
            RankMetric::Trades => "Trades",
            RankMetric::Wins => "Wins",
            RankMetric::Losses => "Losses",
            RankMetric::WinRate => "Win Rate %",
            RankMetric::MaxDdPct => "Max DD %",
            RankMetric::MaxDdCash => "Max DD $",
        }
    }

    pub fn value(&self, m: &RowMetrics) -> f64 {
        match self {
            RankMetric::EquityFinal => m.equity_final,
            RankMetric::ProfitFactor => m.performance.profit_factor,
            RankMetric::AvgTrade => m.performance.avg_trade,
            RankMetric::Expectancy => m.performance.expectancy,
            RankMetric::Trades => m.performance.trades as f64,
            RankMetric::Wins => m.performance.wins as f64,
            RankMetric::Losses => m.performance.losses as f64,
            RankMetric::WinRate => m.win_rate_pct,
            RankMetric::MaxDdPct => m.drawdown.max_pct,
            RankMetric::MaxDdCash => m.drawdown.max_cash,
        }
    }
}

impl FromStr for RankMetric {
    type Err = UnknownMetric;

    /// Accepts the snake_case name or the table title, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|m| normalize(m.name()) == wanted || normalize(m.title()) == wanted)
            .ok_or_else(|| UnknownMetric {
                name: s.to_string(),
                available: Self::ALL.map(|m| m.name()).join(", "),
            })
    }
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercase alphanumerics only: "Equity Final" and "equity_final" agree.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '%' | '$'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
