//! Backtest runner: wires data, strategy, engine and analyzers together.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads data, then runs. Used by the CLI `run` command.
//! - `run_backtest_from_data()`: takes pre-loaded data. Used by the batch runner
//!   so the file is read once per sweep.

use std::time::Instant;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use minibt_core::analyzers::{DrawdownState, PerformanceMetrics, TradeAccountant, TradeLogEntry};
use minibt_core::data::{LoadError, Resampler, Timeframe};
use minibt_core::domain::{Position, Trade};
use minibt_core::engine::{EngineConfig, EngineError, ExecutionEngine};
use minibt_core::strategy::{ParamSet, RegistryError, StrategyRegistry};

use crate::config::ConfigError;
use crate::data_loader::{load_data, DataSource, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// What to run: strategy, parameters, timeframe and engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    pub strategy: String,
    pub params: ParamSet,
    /// `None` runs on the native period of the data.
    pub timeframe: Option<Timeframe>,
    pub engine: EngineConfig,
}

impl RunSpec {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            params: ParamSet::new(),
            timeframe: None,
            engine: EngineConfig::default(),
        }
    }

    pub fn with_params(mut self, params: ParamSet) -> Self {
        self.params = params;
        self
    }

    pub fn with_timeframe(mut self, timeframe: Option<Timeframe>) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// `"30m"` for an explicit timeframe, `"auto"` otherwise.
    pub fn timeframe_label(&self) -> String {
        timeframe_label(self.timeframe)
    }
}

pub fn timeframe_label(timeframe: Option<Timeframe>) -> String {
    timeframe.map_or_else(|| "auto".to_string(), |tf| tf.label())
}

/// Metadata about the bars a run consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInfo {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// Whole days between the first and last bar.
    pub days: i64,
    /// Period of the bars fed to the engine, e.g. `"5m"`.
    pub timeframe: String,
    pub source_bars: usize,
    pub engine_bars: usize,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub strategy: String,
    pub params: ParamSet,
    pub timeframe: String,
    pub data_info: DataInfo,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub equity_start: f64,
    pub equity_end: f64,
    pub metrics: PerformanceMetrics,
    pub drawdown: DrawdownState,
    pub trade_log: Vec<TradeLogEntry>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    pub open_position: Option<Position>,
    pub rejected_intents: usize,
    pub exec_time_secs: f64,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn net_pnl(&self) -> f64 {
        self.equity_end - self.equity_start
    }

    pub fn win_rate_pct(&self) -> f64 {
        self.metrics.win_rate_pct()
    }
}

/// Load data from `source`, then run.
pub fn run_single_backtest(
    spec: &RunSpec,
    source: &DataSource,
    registry: &StrategyRegistry,
) -> Result<BacktestResult, RunError> {
    // Fail on an unknown strategy before touching the data.
    registry.resolve(&spec.strategy)?;
    let data = load_data(source)?;
    run_backtest_from_data(spec, &data, registry)
}

/// Run against pre-loaded data: no I/O.
pub fn run_backtest_from_data(
    spec: &RunSpec,
    data: &LoadedData,
    registry: &StrategyRegistry,
) -> Result<BacktestResult, RunError> {
    let started = Instant::now();

    let mut strategy = registry.build(&spec.strategy, &spec.params)?;
    let engine = ExecutionEngine::new(spec.engine.clone())?;
    let resampler = Resampler::new(&data.bars, spec.timeframe);
    let mut accountant = TradeAccountant::new();

    let run = engine.run(resampler.iter(), &mut strategy, &mut accountant)?;
    let snapshot = accountant.finalize();

    let data_info = DataInfo {
        start: run.first_bar,
        end: run.last_bar,
        days: match (run.first_bar, run.last_bar) {
            (Some(a), Some(b)) => (b - a).num_days(),
            _ => 0,
        },
        timeframe: resampler
            .output_period()
            .and_then(Timeframe::from_seconds)
            .map_or_else(|| "unknown".to_string(), |tf| tf.label()),
        source_bars: data.bars.len(),
        engine_bars: run.bar_count,
    };

    let exec_time_secs = started.elapsed().as_secs_f64();
    debug!(
        strategy = %spec.strategy,
        params = %spec.params,
        timeframe = %data_info.timeframe,
        trades = run.trades.len(),
        exec_time_secs,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        strategy: spec.strategy.clone(),
        params: spec.params.clone(),
        timeframe: spec.timeframe_label(),
        data_info,
        dataset_hash: data.dataset_hash.clone(),
        has_synthetic: data.has_synthetic,
        equity_start: run.initial_cash,
        equity_end: run.final_equity(),
        metrics: snapshot.performance,
        drawdown: snapshot.drawdown,
        trade_log: snapshot.trade_log,
        trades: run.trades,
        equity_curve: run.equity_curve,
        open_position: run.open_position,
        rejected_intents: run.rejected_intents.len(),
        exec_time_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::DataSource;

    fn synthetic() -> LoadedData {
        load_data(&DataSource::Synthetic {
            bars: 2_000,
            seed: 42,
        })
        .unwrap()
    }

    #[test]
    fn runs_sma_test_on_synthetic_data() {
        let data = synthetic();
        let registry = StrategyRegistry::with_defaults();
        let spec = RunSpec::new("sma_test")
            .with_params(ParamSet::new().with("sma_period", 10.0))
            .with_timeframe(Some(Timeframe::from_minutes(5).unwrap()));

        let result = run_backtest_from_data(&spec, &data, &registry).unwrap();
        assert_eq!(result.timeframe, "5m");
        assert_eq!(result.data_info.timeframe, "5m");
        assert_eq!(result.data_info.source_bars, 2_000);
        assert_eq!(result.data_info.engine_bars, 400);
        assert_eq!(result.equity_start, 100_000.0);
        assert!(result.has_synthetic);
        assert_eq!(result.metrics.trades, result.trade_log.len());

        let net: f64 = result.trades.iter().map(|t| t.net_pnl).sum();
        let unrealized = result.equity_end - (100_000.0 + net);
        if result.open_position.is_none() {
            assert!(unrealized.abs() < 1e-6);
        }
    }

    #[test]
    fn auto_timeframe_uses_native_period() {
        let data = synthetic();
        let registry = StrategyRegistry::with_defaults();
        let result = run_backtest_from_data(&RunSpec::new("sma_test"), &data, &registry).unwrap();
        assert_eq!(result.timeframe, "auto");
        assert_eq!(result.data_info.timeframe, "1m");
        assert_eq!(result.data_info.engine_bars, 2_000);
    }

    #[test]
    fn unknown_strategy_is_a_registry_error() {
        let registry = StrategyRegistry::with_defaults();
        let err = run_single_backtest(
            &RunSpec::new("does_not_exist"),
            &DataSource::Synthetic { bars: 10, seed: 1 },
            &registry,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RunError::Registry(RegistryError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn invalid_params_are_reported() {
        let data = synthetic();
        let registry = StrategyRegistry::with_defaults();
        let spec = RunSpec::new("sma_test").with_params(ParamSet::new().with("bogus", 1.0));
        let err = run_backtest_from_data(&spec, &data, &registry).unwrap_err();
        assert!(matches!(
            err,
            RunError::Registry(RegistryError::InvalidParams { .. })
        ));
    }

    #[test]
    fn result_serializes_to_json() {
        let data = synthetic();
        let registry = StrategyRegistry::with_defaults();
        let result = run_backtest_from_data(&RunSpec::new("sma_test"), &data, &registry).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let back: BacktestResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.schema_version, SCHEMA_VERSION);
        assert_eq!(back.trade_log.len(), result.trade_log.len());
    }
}
