use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential trade number within a single run, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic trade id generator owned by one engine run.
#[derive(Debug, Default, Clone)]
pub struct TradeIdGen {
    next: u64,
}

impl TradeIdGen {
    pub fn next_id(&mut self) -> TradeId {
        self.next += 1;
        TradeId(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut gen = TradeIdGen::default();
        assert_eq!(gen.next_id(), TradeId(1));
        assert_eq!(gen.next_id(), TradeId(2));
        assert_eq!(TradeId(7).to_string(), "7");
    }
}
