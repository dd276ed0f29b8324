//! Resampler: aggregates finest-granularity bars into coarser periods.
//!
//! Bar timestamps are bar close times. A target period of `p` seconds splits
//! each day into windows `(k·p, (k+1)·p]` counted from midnight; a bar belongs
//! to the window that contains its close time, and the aggregated bar is
//! stamped with the window's right edge. This matches how 1-minute exports
//! label bars: the 09:35 bar closes the 09:31..09:35 five-minute bucket.
//!
//! Resampling is lazy and restartable: [`Resampler::iter`] walks the source
//! slice from the start every time it is called, so independent runs never
//! share aggregation state.

use std::collections::HashMap;
use std::slice;

use chrono::{Duration, NaiveDateTime, Timelike};

use super::timeframe::Timeframe;
use crate::domain::Bar;

/// Most frequent gap between consecutive timestamps, in seconds.
///
/// Ties resolve toward the smaller gap. Returns `None` when fewer than two
/// bars are available. On irregular data this is a best-effort estimate.
pub fn detect_native_period(bars: &[Bar]) -> Option<i64> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for pair in bars.windows(2) {
        let delta = (pair[1].timestamp - pair[0].timestamp).num_seconds();
        *counts.entry(delta).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(da, ca), (db, cb)| ca.cmp(cb).then(db.cmp(da)))
        .map(|(delta, _)| delta)
}

/// Resampling plan over a borrowed bar series.
#[derive(Debug, Clone)]
pub struct Resampler<'a> {
    source: &'a [Bar],
    native_secs: Option<i64>,
    target_secs: Option<i64>,
}

impl<'a> Resampler<'a> {
    /// Plan a pass over `source`. `None` keeps the native period.
    pub fn new(source: &'a [Bar], target: Option<Timeframe>) -> Self {
        Self {
            source,
            native_secs: detect_native_period(source),
            target_secs: target.map(|tf| tf.seconds()),
        }
    }

    /// Detected native period of the source, in seconds.
    pub fn native_period(&self) -> Option<i64> {
        self.native_secs
    }

    /// Period of the bars this resampler yields, in seconds.
    pub fn output_period(&self) -> Option<i64> {
        match (self.target_secs, self.native_secs) {
            (Some(target), Some(native)) => Some(target.max(native)),
            (Some(target), None) => Some(target),
            (None, native) => native,
        }
    }

    /// Whether bars pass through untouched.
    pub fn is_passthrough(&self) -> bool {
        match (self.target_secs, self.native_secs) {
            (Some(target), Some(native)) => target <= native,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// A fresh lazy pass over the source.
    pub fn iter(&self) -> ResampledBars<'a> {
        let period = if self.is_passthrough() {
            None
        } else {
            self.target_secs
        };
        ResampledBars {
            source: self.source.iter(),
            period_secs: period,
            pending: None,
        }
    }
}

impl<'a> IntoIterator for &Resampler<'a> {
    type Item = Bar;
    type IntoIter = ResampledBars<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy aggregated bar stream. A bucket is yielded once the first bar of the
/// next bucket arrives, or at end of input for a non-empty partial bucket.
#[derive(Debug, Clone)]
pub struct ResampledBars<'a> {
    source: slice::Iter<'a, Bar>,
    period_secs: Option<i64>,
    pending: Option<Bar>,
}

impl Iterator for ResampledBars<'_> {
    type Item = Bar;

    fn next(&mut self) -> Option<Bar> {
        let Some(period) = self.period_secs else {
            return self.source.next().cloned();
        };

        for bar in self.source.by_ref() {
            let edge = bucket_edge(bar.timestamp, period);
            match self.pending.as_mut() {
                Some(acc) if acc.timestamp == edge => merge_into(acc, bar),
                Some(_) => {
                    let done = self.pending.replace(start_bucket(bar, edge));
                    return done;
                }
                None => self.pending = Some(start_bucket(bar, edge)),
            }
        }
        self.pending.take()
    }
}

/// Right edge of the window containing `ts`.
fn bucket_edge(ts: NaiveDateTime, period_secs: i64) -> NaiveDateTime {
    let secs = i64::from(ts.num_seconds_from_midnight());
    let midnight = ts - Duration::seconds(secs) - Duration::nanoseconds(i64::from(ts.nanosecond()));
    let k = (secs + period_secs - 1) / period_secs;
    midnight + Duration::seconds(k * period_secs)
}

fn start_bucket(bar: &Bar, edge: NaiveDateTime) -> Bar {
    Bar {
        timestamp: edge,
        ..bar.clone()
    }
}

fn merge_into(acc: &mut Bar, bar: &Bar) {
    acc.high = acc.high.max(bar.high);
    acc.low = acc.low.min(bar.low);
    acc.close = bar.close;
    acc.volume += bar.volume;
}
