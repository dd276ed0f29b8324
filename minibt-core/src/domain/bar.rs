//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV sample over a fixed time interval for the single traded instrument.
///
/// `timestamp` is the time the bar closed, as written in the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Structural problems with a bar or bar series.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BarError {
    #[error("bar at {timestamp} violates OHLC bounds (o={open} h={high} l={low} c={close})")]
    InvalidRange {
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
    #[error("timestamps not strictly increasing: {previous} followed by {current}")]
    NotAscending {
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// OHLC sanity check: high bounds every price from above, low from below.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    pub fn validate(&self) -> Result<(), BarError> {
        if self.is_sane() {
            Ok(())
        } else {
            Err(BarError::InvalidRange {
                timestamp: self.timestamp,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            })
        }
    }
}

/// Check the series invariant: timestamps strictly increasing.
pub fn check_ascending(bars: &[Bar]) -> Result<(), BarError> {
    for pair in bars.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(BarError::NotAscending {
                previous: pair[0].timestamp,
                current: pair[1].timestamp,
            });
        }
    }
    Ok(())
}
