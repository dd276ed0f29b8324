//! TradeLog: one display row per closed trade, in close order.

use std::io::Write;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::Analyzer;
use crate::domain::{Side, Trade, TradeId};

/// A closed trade rounded for display. Money columns carry 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub trade_id: TradeId,
    pub close_date: NaiveDate,
    pub close_time: NaiveTime,
    pub direction: Side,
    pub contracts: f64,
    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,
}

impl From<&Trade> for TradeLogEntry {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.id,
            close_date: trade.close_time.date(),
            close_time: trade.close_time.time(),
            direction: trade.direction,
            contracts: trade.size.abs(),
            gross_pnl: round2(trade.gross_pnl),
            commission: round2(trade.commission),
            net_pnl: round2(trade.net_pnl),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Flat CSV row. Dates and times go out as text.
#[derive(Serialize)]
struct CsvRow<'a> {
    trade_id: u64,
    close_date: String,
    close_time: String,
    direction: &'a str,
    contracts: f64,
    gross_pnl: f64,
    commission: f64,
    net_pnl: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TradeLog {
    entries: Vec<TradeLogEntry>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TradeLogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TradeLogEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write all rows as CSV with a header line.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        write_entries_csv(&self.entries, writer)
    }
}

/// CSV export shared by [`TradeLog::write_csv`] and callers that only hold
/// the finalized entries.
pub fn write_entries_csv<W: Write>(entries: &[TradeLogEntry], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for e in entries {
        wtr.serialize(CsvRow {
            trade_id: e.trade_id.0,
            close_date: e.close_date.format("%Y-%m-%d").to_string(),
            close_time: e.close_time.format("%H:%M:%S").to_string(),
            direction: e.direction.label(),
            contracts: e.contracts,
            gross_pnl: e.gross_pnl,
            commission: e.commission,
            net_pnl: e.net_pnl,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

impl Analyzer for TradeLog {
    fn on_trade_close(&mut self, trade: &Trade) {
        self.entries.push(TradeLogEntry::from(trade));
    }
}
