//! Timeframe: a validated bar period in whole minutes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Timeframes the tooling is routinely used with. Others are allowed.
pub const COMMON_TIMEFRAMES: [u32; 6] = [1, 5, 10, 15, 30, 60];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimeframeError {
    #[error("timeframe is empty")]
    Empty,
    #[error("invalid timeframe '{0}': expected whole minutes like '5m' or '5'")]
    InvalidFormat(String),
    #[error("timeframe must be at least 1 minute, got '{0}'")]
    NotPositive(String),
}

/// Bar period in minutes. Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    minutes: u32,
}

impl Timeframe {
    pub fn from_minutes(minutes: u32) -> Result<Self, TimeframeError> {
        if minutes == 0 {
            return Err(TimeframeError::NotPositive(minutes.to_string()));
        }
        Ok(Self { minutes })
    }

    /// Accepts only integral, positive values (`30.0` yes, `2.5` no).
    pub fn from_f64(value: f64) -> Result<Self, TimeframeError> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(TimeframeError::InvalidFormat(value.to_string()));
        }
        if value < 1.0 {
            return Err(TimeframeError::NotPositive(value.to_string()));
        }
        if value > u32::MAX as f64 {
            return Err(TimeframeError::InvalidFormat(value.to_string()));
        }
        Self::from_minutes(value as u32)
    }

    /// Whole minutes covered by a period of `seconds`, if at least one.
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        let minutes = u32::try_from(seconds / 60).ok()?;
        Self::from_minutes(minutes).ok()
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn seconds(&self) -> i64 {
        i64::from(self.minutes) * 60
    }

    /// Display label, e.g. `"30m"`.
    pub fn label(&self) -> String {
        format!("{}m", self.minutes)
    }

    pub fn is_common(&self) -> bool {
        COMMON_TIMEFRAMES.contains(&self.minutes)
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TimeframeError::Empty);
        }
        let lower = trimmed.to_ascii_lowercase();
        let digits = lower.strip_suffix('m').unwrap_or(&lower);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            if let Some(rest) = digits.strip_prefix('-') {
                if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                    return Err(TimeframeError::NotPositive(trimmed.to_string()));
                }
            }
            return Err(TimeframeError::InvalidFormat(trimmed.to_string()));
        }
        let minutes: u32 = digits
            .parse()
            .map_err(|_| TimeframeError::InvalidFormat(trimmed.to_string()))?;
        if minutes == 0 {
            return Err(TimeframeError::NotPositive(trimmed.to_string()));
        }
        Ok(Self { minutes })
    }
}

impl TryFrom<String> for Timeframe {
    type Error = TimeframeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.label()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.minutes)
    }
}
