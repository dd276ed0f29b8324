//! Engine configuration, errors and run result types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BarError, BrokerState, OrderIntent, Position, Trade};
use crate::strategy::StrategyError;

/// Starting cash for every run unless overridden.
pub const DEFAULT_INITIAL_CASH: f64 = 100_000.0;
/// Round-turn commission per contract.
pub const DEFAULT_COMMISSION: f64 = 1.24;
/// Contracts per entry.
pub const DEFAULT_ORDER_SIZE: f64 = 1.0;

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_cash: f64,
    /// Round-turn commission per contract, charged once when a trade closes.
    pub commission: f64,
    /// Contracts per entry, exposed to strategies through their context.
    pub order_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: DEFAULT_INITIAL_CASH,
            commission: DEFAULT_COMMISSION,
            order_size: DEFAULT_ORDER_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(EngineError::InvalidConfig {
                field: "initial_cash",
                message: format!("must be a positive number, got {}", self.initial_cash),
            });
        }
        if !self.commission.is_finite() || self.commission < 0.0 {
            return Err(EngineError::InvalidConfig {
                field: "commission",
                message: format!("must be >= 0, got {}", self.commission),
            });
        }
        if !self.order_size.is_finite() || self.order_size <= 0.0 {
            return Err(EngineError::InvalidConfig {
                field: "order_size",
                message: format!("must be > 0, got {}", self.order_size),
            });
        }
        Ok(())
    }
}

/// Errors that abort an engine run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine config: {field} {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("bad bar at index {bar_index}: {source}")]
    Bar {
        bar_index: usize,
        #[source]
        source: BarError,
    },
}

/// Why an intent was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Entry requested while a position is already open.
    AlreadyOpen,
    /// Close requested while flat.
    NoPosition,
    /// Entry size was zero, negative, or not finite.
    InvalidSize,
}

/// An intent the engine ignored, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedIntent {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub intent: OrderIntent,
    pub reason: RejectReason,
}

/// Everything produced by one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<Trade>,
    pub initial_cash: f64,
    pub final_broker: BrokerState,
    pub bar_count: usize,
    pub first_bar: Option<NaiveDateTime>,
    pub last_bar: Option<NaiveDateTime>,
    /// Position still open after the last bar; never force-closed.
    pub open_position: Option<Position>,
    pub rejected_intents: Vec<RejectedIntent>,
    /// Marked equity after each bar.
    pub equity_curve: Vec<f64>,
}

impl RunResult {
    pub fn final_equity(&self) -> f64 {
        self.final_broker.equity
    }

    pub fn net_pnl(&self) -> f64 {
        self.final_broker.equity - self.initial_cash
    }

    pub fn total_commission(&self) -> f64 {
        self.trades.iter().map(|t| t.commission).sum()
    }
}
