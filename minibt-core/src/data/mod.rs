//! Bar data: file loading, timeframe handling, and resampling.

pub mod loader;
pub mod resample;
pub mod timeframe;

pub use loader::{load_bars, read_bars, LoadError, DATETIME_FORMAT};
pub use resample::{detect_native_period, ResampledBars, Resampler};
pub use timeframe::{Timeframe, TimeframeError};
