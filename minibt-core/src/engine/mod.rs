//! Execution engine: drives a strategy bar by bar over a single instrument.
//!
//! Per bar the engine:
//!
//! 1. Hands the bar and a read-only context to the strategy
//! 2. Applies the returned intent at the bar's close (round-turn commission
//!    is charged when the position closes)
//! 3. Notifies analyzers of a closed trade, if any
//! 4. Marks equity to the close and notifies analyzers of the bar

pub mod event_loop;
pub mod state;

pub use event_loop::ExecutionEngine;
pub use state::{EngineConfig, EngineError, RejectReason, RejectedIntent, RunResult};
