//! Order intents a strategy may hand to the engine.

use serde::{Deserialize, Serialize};

/// The only two orders the engine accepts.
///
/// Both fill immediately at the current bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderIntent {
    /// Open a long position of the given number of contracts.
    OpenLong { size: f64 },
    /// Fully close the current position.
    Close,
}

impl OrderIntent {
    pub fn name(&self) -> &'static str {
        match self {
            OrderIntent::OpenLong { .. } => "open_long",
            OrderIntent::Close => "close",
        }
    }
}
