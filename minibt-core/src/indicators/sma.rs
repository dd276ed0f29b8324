//! Simple Moving Average (SMA), updated one close at a time.
//!
//! First defined value arrives with the `period`-th update.

use std::collections::VecDeque;

const RESUM_INTERVAL: u64 = 1024;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    updates: u64,
}

impl Sma {
    /// `period` must be at least 1; callers validate it beforehand.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            updates: 0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Push the next close and return the updated average, if defined.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if self.window.len() == self.period {
            if let Some(leaving) = self.window.pop_front() {
                self.sum -= leaving;
            }
        }
        self.window.push_back(close);
        self.sum += close;

        self.updates += 1;

        // Re-sum periodically so long runs don't drift.
        if self.updates % RESUM_INTERVAL == 0 {
            self.sum = self.window.iter().sum();
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.window.len() < self.period {
            return None;
        }
        Some(self.sum / self.period as f64)
    }
}
