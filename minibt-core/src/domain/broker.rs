//! BrokerState: flat cash balance plus the fixed commission schedule.

use serde::{Deserialize, Serialize};

/// Cash and equity of one run. Owned by the engine; never shared across runs.
///
/// Futures-style accounting: opening a position moves no cash. At close the
/// broker credits gross PnL and debits the round-turn commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerState {
    pub cash: f64,
    pub equity: f64,
    /// Round-turn commission per contract.
    pub commission_per_contract: f64,
}

impl BrokerState {
    pub fn new(initial_cash: f64, commission_per_contract: f64) -> Self {
        Self {
            cash: initial_cash,
            equity: initial_cash,
            commission_per_contract,
        }
    }

    /// Commission charged once for a round trip of `contracts`.
    pub fn round_turn_commission(&self, contracts: f64) -> f64 {
        self.commission_per_contract * contracts.abs()
    }

    /// Book a closed trade's result into cash.
    pub fn settle(&mut self, gross_pnl: f64, commission: f64) {
        self.cash += gross_pnl - commission;
    }

    /// Equity = cash + unrealized PnL of the open position.
    pub fn mark(&mut self, unrealized_pnl: f64) {
        self.equity = self.cash + unrealized_pnl;
    }
}
