//! Strategy capability trait and the bundled strategies.
//!
//! The engine drives a strategy explicitly: once per bar it passes the bar and
//! a read-only [`StrategyContext`], and the strategy answers with at most one
//! [`OrderIntent`]. Strategies never touch broker state.

pub mod params;
pub mod registry;
pub mod sma_test;

pub use params::{ParamError, ParamSet, ParamValue};
pub use registry::{RegistryError, StrategyRegistry};
pub use sma_test::{SmaTest, SmaTestParams};

use thiserror::Error;

use crate::domain::{Bar, OrderIntent, Position};

/// Failure raised by a strategy while processing a bar. Fatal to the run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StrategyError {
    #[error("strategy '{strategy}' failed at bar {bar_index}: {message}")]
    Failed {
        strategy: String,
        bar_index: usize,
        message: String,
    },
    #[error(transparent)]
    Params(#[from] ParamError),
}

/// What a strategy may observe about the engine on each bar.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    position: &'a Position,
    bar_index: usize,
    order_size: f64,
}

impl<'a> StrategyContext<'a> {
    pub fn new(position: &'a Position, bar_index: usize, order_size: f64) -> Self {
        Self {
            position,
            bar_index,
            order_size,
        }
    }

    /// Is a position currently open?
    pub fn has_position(&self) -> bool {
        self.position.is_open()
    }

    pub fn position(&self) -> &Position {
        self.position
    }

    /// Zero-based index of the bar being delivered.
    pub fn bar_index(&self) -> usize {
        self.bar_index
    }

    /// Fixed contract count for entries.
    pub fn order_size(&self) -> f64 {
        self.order_size
    }

    pub fn open_long(&self) -> OrderIntent {
        OrderIntent::OpenLong {
            size: self.order_size,
        }
    }
}

/// Trading-decision logic consulted by the engine once per bar.
pub trait Strategy: Send {
    /// Registry name, e.g. `"sma_test"`.
    fn name(&self) -> &str;

    /// Observe `bar` and optionally issue one order intent.
    fn on_bar(
        &mut self,
        bar: &Bar,
        ctx: &StrategyContext<'_>,
    ) -> Result<Option<OrderIntent>, StrategyError>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_bar(
        &mut self,
        bar: &Bar,
        ctx: &StrategyContext<'_>,
    ) -> Result<Option<OrderIntent>, StrategyError> {
        (**self).on_bar(bar, ctx)
    }
}
