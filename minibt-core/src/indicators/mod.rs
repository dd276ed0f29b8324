//! Streaming indicators used by the bundled strategies.

pub mod sma;

pub use sma::Sma;
