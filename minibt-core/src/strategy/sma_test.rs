//! `sma_test`: SMA entry with a fixed stop and an R-multiple target.
//!
//! Long-only. Enters when the close is above its SMA. While in a position it
//! exits when the close reaches `entry - stop_points` or
//! `entry + stop_points * target_rr`, whichever comes first.

use super::params::{ParamError, ParamSet};
use super::{Strategy, StrategyContext, StrategyError};
use crate::domain::{Bar, OrderIntent};
use crate::indicators::Sma;

pub const NAME: &str = "sma_test";

const PARAM_NAMES: [&str; 3] = ["sma_period", "stop_points", "target_rr"];

/// Validated, immutable parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmaTestParams {
    pub sma_period: usize,
    pub stop_points: f64,
    pub target_rr: f64,
}

impl Default for SmaTestParams {
    fn default() -> Self {
        Self {
            sma_period: 30,
            stop_points: 20.0,
            target_rr: 2.0,
        }
    }
}

impl SmaTestParams {
    /// Build from a parameter set; absent names keep their defaults.
    pub fn from_params(params: &ParamSet) -> Result<Self, ParamError> {
        params.check_known(&PARAM_NAMES)?;
        let defaults = Self::default();
        let parsed = Self {
            sma_period: params.get_usize("sma_period")?.unwrap_or(defaults.sma_period),
            stop_points: params.get_f64("stop_points")?.unwrap_or(defaults.stop_points),
            target_rr: params.get_f64("target_rr")?.unwrap_or(defaults.target_rr),
        };
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if self.sma_period == 0 {
            return Err(ParamError::OutOfRange {
                name: "sma_period".into(),
                message: "must be at least 1".into(),
            });
        }
        if !(self.stop_points > 0.0) {
            return Err(ParamError::OutOfRange {
                name: "stop_points".into(),
                message: format!("must be positive, got {}", self.stop_points),
            });
        }
        if !(self.target_rr > 0.0) {
            return Err(ParamError::OutOfRange {
                name: "target_rr".into(),
                message: format!("must be positive, got {}", self.target_rr),
            });
        }
        Ok(())
    }

    pub fn stop_price(&self, entry: f64) -> f64 {
        entry - self.stop_points
    }

    pub fn target_price(&self, entry: f64) -> f64 {
        entry + self.stop_points * self.target_rr
    }
}

#[derive(Debug, Clone)]
pub struct SmaTest {
    params: SmaTestParams,
    sma: Sma,
    entry_price: Option<f64>,
}

impl SmaTest {
    pub fn new(params: SmaTestParams) -> Self {
        Self {
            params,
            sma: Sma::new(params.sma_period),
            entry_price: None,
        }
    }

    pub fn from_params(params: &ParamSet) -> Result<Self, ParamError> {
        Ok(Self::new(SmaTestParams::from_params(params)?))
    }

    pub fn params(&self) -> &SmaTestParams {
        &self.params
    }
}

impl Strategy for SmaTest {
    fn name(&self) -> &str {
        NAME
    }

    fn on_bar(
        &mut self,
        bar: &Bar,
        ctx: &StrategyContext<'_>,
    ) -> Result<Option<OrderIntent>, StrategyError> {
        let sma = self.sma.update(bar.close);

        if !ctx.has_position() {
            self.entry_price = None;
            return Ok(match sma {
                Some(avg) if bar.close > avg => {
                    self.entry_price = Some(bar.close);
                    Some(ctx.open_long())
                }
                _ => None,
            });
        }

        let entry = self.entry_price.unwrap_or(ctx.position().entry_price);
        if bar.close <= self.params.stop_price(entry) || bar.close >= self.params.target_price(entry)
        {
            return Ok(Some(OrderIntent::Close));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Position;
    use chrono::{Duration, NaiveDate};

    fn bar(i: i64, close: f64) -> Bar {
        let t0 = NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(9, 31, 0)
            .unwrap();
        Bar::new(t0 + Duration::minutes(i), close, close, close, close, 1.0)
    }

    #[test]
    fn params_default_when_absent() {
        let p = SmaTestParams::from_params(&ParamSet::new()).unwrap();
        assert_eq!(p, SmaTestParams::default());
    }

    #[test]
    fn params_reject_bad_values() {
        let zero = ParamSet::new().with("sma_period", 0.0);
        assert!(matches!(
            SmaTestParams::from_params(&zero),
            Err(ParamError::OutOfRange { .. })
        ));
        let frac = ParamSet::new().with("sma_period", 2.5);
        assert!(matches!(
            SmaTestParams::from_params(&frac),
            Err(ParamError::WrongType { .. })
        ));
        let unknown = ParamSet::new().with("period", 5.0);
        assert!(matches!(
            SmaTestParams::from_params(&unknown),
            Err(ParamError::Unknown { .. })
        ));
        let neg = ParamSet::new().with("stop_points", -1.0);
        assert!(SmaTestParams::from_params(&neg).is_err());
    }

    #[test]
    fn stop_and_target_levels() {
        let p = SmaTestParams {
            sma_period: 3,
            stop_points: 10.0,
            target_rr: 1.5,
        };
        assert_eq!(p.stop_price(100.0), 90.0);
        assert_eq!(p.target_price(100.0), 115.0);
    }

    #[test]
    fn no_entry_before_sma_is_defined() {
        let mut s = SmaTest::new(SmaTestParams {
            sma_period: 3,
            ..SmaTestParams::default()
        });
        let flat = Position::flat();
        let ctx = StrategyContext::new(&flat, 0, 1.0);
        assert_eq!(s.on_bar(&bar(0, 100.0), &ctx).unwrap(), None);
        assert_eq!(s.on_bar(&bar(1, 101.0), &ctx).unwrap(), None);
        // third close 105 > mean(100, 101, 105)
        assert_eq!(
            s.on_bar(&bar(2, 105.0), &ctx).unwrap(),
            Some(OrderIntent::OpenLong { size: 1.0 })
        );
    }

    #[test]
    fn exits_on_stop_and_target() {
        let params = SmaTestParams {
            sma_period: 1,
            stop_points: 5.0,
            target_rr: 2.0,
        };
        let mut s = SmaTest::new(params);
        s.entry_price = Some(100.0);
        let open = Position::open(1.0, 100.0, bar(0, 100.0).timestamp, 0);
        let ctx = StrategyContext::new(&open, 1, 1.0);

        assert_eq!(s.on_bar(&bar(1, 103.0), &ctx).unwrap(), None);
        assert_eq!(
            s.on_bar(&bar(2, 95.0), &ctx).unwrap(),
            Some(OrderIntent::Close)
        );
        assert_eq!(
            s.on_bar(&bar(3, 110.0), &ctx).unwrap(),
            Some(OrderIntent::Close)
        );
    }
}
