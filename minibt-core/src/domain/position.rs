use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a position or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The engine's single position slot.
///
/// `size` is signed: positive long, negative short, zero flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub size: f64,
    pub entry_price: f64,
    pub entry_time: Option<NaiveDateTime>,
    pub entry_bar: usize,
}

impl Position {
    pub fn flat() -> Self {
        Self {
            size: 0.0,
            entry_price: 0.0,
            entry_time: None,
            entry_bar: 0,
        }
    }

    pub fn open(size: f64, entry_price: f64, entry_time: NaiveDateTime, entry_bar: usize) -> Self {
        Self {
            size,
            entry_price,
            entry_time: Some(entry_time),
            entry_bar,
        }
    }

    pub fn is_open(&self) -> bool {
        self.size != 0.0
    }

    pub fn side(&self) -> Option<Side> {
        if self.size > 0.0 {
            Some(Side::Long)
        } else if self.size < 0.0 {
            Some(Side::Short)
        } else {
            None
        }
    }

    /// Number of contracts regardless of direction.
    pub fn contracts(&self) -> f64 {
        self.size.abs()
    }

    /// Points gained per contract times signed size.
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.size * (current_price - self.entry_price)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::flat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn flat_position_has_no_side() {
        let pos = Position::flat();
        assert!(!pos.is_open());
        assert_eq!(pos.side(), None);
        assert_eq!(pos.unrealized_pnl(123.0), 0.0);
    }

    #[test]
    fn long_and_short_pnl() {
        let long = Position::open(2.0, 100.0, t0(), 0);
        assert_eq!(long.side(), Some(Side::Long));
        assert_eq!(long.unrealized_pnl(105.0), 10.0);

        let short = Position::open(-1.0, 100.0, t0(), 0);
        assert_eq!(short.side(), Some(Side::Short));
        assert_eq!(short.contracts(), 1.0);
        assert_eq!(short.unrealized_pnl(105.0), -5.0);
    }
}
