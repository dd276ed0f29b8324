//! Trade: a completed round trip, created once when a position returns to flat.

use super::ids::TradeId;
use super::position::Side;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A closed round-trip trade. Immutable once created by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    /// True entry side, taken from the opening fill.
    pub direction: Side,

    // ── Entry ──
    pub open_time: NaiveDateTime,
    pub entry_bar: usize,
    pub entry_price: f64,

    // ── Exit ──
    pub close_time: NaiveDateTime,
    pub exit_bar: usize,
    pub exit_price: f64,

    /// Contract count (always positive).
    pub size: f64,

    // ── PnL ──
    pub gross_pnl: f64,
    /// Round-turn commission for the whole trade.
    pub commission: f64,
    pub net_pnl: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}
