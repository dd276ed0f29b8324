//! MiniBT Runner: backtest orchestration, batch sweeps, ranking, export.
//!
//! This crate builds on `minibt-core` to provide:
//! - Data loading from bar files or a seeded synthetic series
//! - Single-backtest runner with data info and timing
//! - Batch configuration files (JSON or TOML)
//! - Cartesian parameter grids and the batch runner
//! - Ranking and CSV/JSON export

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod grid;
pub mod ranking;
pub mod runner;

pub use batch::{BatchResults, BatchRow, BatchRunner, RowMetrics};
pub use config::{BatchFile, BatchSpec, ConfigError, GlobalConfig};
pub use data_loader::{load_data, DataSource, LoadedData};
pub use grid::{GridPoint, ParameterGrid, TIMEFRAME_KEY};
pub use ranking::{RankMetric, UnknownMetric};
pub use runner::{
    run_backtest_from_data, run_single_backtest, BacktestResult, DataInfo, RunError, RunSpec,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn batch_types_are_send_sync() {
        assert_send::<BatchResults>();
        assert_sync::<BatchResults>();
        assert_send::<BatchRunner<'static>>();
        assert_sync::<BatchRunner<'static>>();
        assert_send::<GridPoint>();
        assert_sync::<GridPoint>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BatchFile>();
        assert_sync::<BatchFile>();
        assert_send::<RunSpec>();
        assert_sync::<RunSpec>();
    }

    #[test]
    fn loaded_data_is_send_sync() {
        assert_send::<LoadedData>();
        assert_sync::<LoadedData>();
    }
}
