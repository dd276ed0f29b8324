//! Batch runner: one isolated backtest per grid combination.
//!
//! Rows come back in generation order whether the sweep runs sequentially or
//! on the rayon pool. A combination that fails becomes a failed row and the
//! sweep carries on; [`BatchRunner::run_fail_fast`] aborts on the first
//! failure instead.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use minibt_core::analyzers::{DrawdownState, PerformanceMetrics};
use minibt_core::data::Timeframe;
use minibt_core::engine::EngineConfig;
use minibt_core::strategy::{ParamSet, StrategyRegistry};

use crate::data_loader::LoadedData;
use crate::grid::{GridPoint, ParameterGrid};
use crate::ranking::RankMetric;
use crate::runner::{run_backtest_from_data, timeframe_label, BacktestResult, RunError, RunSpec};

/// Metrics of a successful row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMetrics {
    pub equity_final: f64,
    pub performance: PerformanceMetrics,
    pub drawdown: DrawdownState,
    pub win_rate_pct: f64,
}

impl From<&BacktestResult> for RowMetrics {
    fn from(result: &BacktestResult) -> Self {
        Self {
            equity_final: result.equity_end,
            performance: result.metrics.clone(),
            drawdown: result.drawdown,
            win_rate_pct: result.win_rate_pct(),
        }
    }
}

/// One line of the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    /// Combination index in generation order.
    pub index: usize,
    /// Strategy parameters the run used (fixed merged with variable).
    pub params: ParamSet,
    /// `"30m"`, or `"auto"` when the native period was used.
    pub timeframe: String,
    pub metrics: Option<RowMetrics>,
    pub error: Option<String>,
    pub exec_time_secs: f64,
}

impl BatchRow {
    pub fn is_ok(&self) -> bool {
        self.metrics.is_some()
    }

    pub fn status(&self) -> &'static str {
        if self.is_ok() {
            "ok"
        } else {
            "failed"
        }
    }

    pub fn metric(&self, metric: RankMetric) -> Option<f64> {
        self.metrics.as_ref().map(|m| metric.value(m))
    }
}

/// The full result table of one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    pub batch: String,
    pub strategy: String,
    pub dataset_hash: String,
    pub rows: Vec<BatchRow>,
}

impl BatchResults {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ok_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchRow> {
        self.rows.iter().filter(|r| !r.is_ok())
    }

    /// Successful rows, best first by `metric`. Ties keep generation order.
    pub fn ranked(&self, metric: RankMetric) -> Vec<&BatchRow> {
        let mut ok: Vec<(&BatchRow, f64)> = self
            .rows
            .iter()
            .filter_map(|r| r.metric(metric).map(|v| (r, v)))
            .collect();
        ok.sort_by(|a, b| b.1.total_cmp(&a.1));
        ok.into_iter().map(|(r, _)| r).collect()
    }

    /// Top `n` successful rows by `metric`, descending.
    pub fn get_best(&self, metric: RankMetric, n: usize) -> Vec<&BatchRow> {
        let mut ranked = self.ranked(metric);
        ranked.truncate(n);
        ranked
    }

    /// Every row: successful ones ranked by `metric`, failed ones after them
    /// in generation order.
    pub fn sorted_by(&self, metric: RankMetric) -> Vec<&BatchRow> {
        let mut rows = self.ranked(metric);
        rows.extend(self.failed());
        rows
    }

    /// Write the full table as CSV.
    pub fn save_results(&self, path: &Path) -> anyhow::Result<()> {
        crate::export::write_batch_csv(self, path)
    }
}

/// Parameter sweep executor.
pub struct BatchRunner<'r> {
    registry: &'r StrategyRegistry,
    strategy: String,
    engine: EngineConfig,
    base_timeframe: Option<Timeframe>,
    parallel: bool,
}

impl<'r> BatchRunner<'r> {
    pub fn new(registry: &'r StrategyRegistry, strategy: impl Into<String>) -> Self {
        Self {
            registry,
            strategy: strategy.into(),
            engine: EngineConfig::default(),
            base_timeframe: None,
            parallel: false,
        }
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Timeframe for combinations that do not set one. `None` auto-detects.
    pub fn with_base_timeframe(mut self, timeframe: Option<Timeframe>) -> Self {
        self.base_timeframe = timeframe;
        self
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every combination, recording failures as rows.
    ///
    /// Errors only for problems that make the whole sweep meaningless: an
    /// unknown strategy, an invalid engine config or a malformed timeframe.
    pub fn run(
        &self,
        batch: &str,
        grid: &ParameterGrid,
        data: &LoadedData,
    ) -> Result<BatchResults, RunError> {
        let points = self.prepare(grid)?;
        let total = points.len();
        info!(batch, strategy = %self.strategy, combinations = total, parallel = self.parallel, "starting batch");

        let run_one = |point: &GridPoint| self.run_point(point, total, data);
        let rows: Vec<BatchRow> = if self.parallel {
            points.par_iter().map(run_one).collect()
        } else {
            points.iter().map(run_one).collect()
        };

        let results = self.finish(batch, data, rows);
        info!(
            batch,
            ok = results.ok_count(),
            failed = results.len() - results.ok_count(),
            "batch finished"
        );
        Ok(results)
    }

    /// Run every combination, aborting on the first failure.
    pub fn run_fail_fast(
        &self,
        batch: &str,
        grid: &ParameterGrid,
        data: &LoadedData,
    ) -> Result<BatchResults, RunError> {
        let points = self.prepare(grid)?;
        let total = points.len();

        let run_one = |point: &GridPoint| -> Result<BatchRow, RunError> {
            let spec = self.spec_for(point);
            info!(combination = point.index + 1, total, params = %point.params, "running");
            let result = run_backtest_from_data(&spec, data, self.registry)?;
            Ok(ok_row(point, &spec, &result))
        };
        let rows = if self.parallel {
            points.par_iter().map(run_one).collect::<Result<Vec<_>, _>>()?
        } else {
            points.iter().map(run_one).collect::<Result<Vec<_>, _>>()?
        };

        Ok(self.finish(batch, data, rows))
    }

    fn prepare(&self, grid: &ParameterGrid) -> Result<Vec<GridPoint>, RunError> {
        self.registry.resolve(&self.strategy)?;
        self.engine.validate()?;
        let points = grid.points()?;
        if points.is_empty() {
            warn!("parameter grid has an empty candidate list; nothing to run");
        }
        Ok(points)
    }

    fn spec_for(&self, point: &GridPoint) -> RunSpec {
        RunSpec::new(self.strategy.clone())
            .with_params(point.params.clone())
            .with_timeframe(point.timeframe.or(self.base_timeframe))
            .with_engine(self.engine.clone())
    }

    fn run_point(&self, point: &GridPoint, total: usize, data: &LoadedData) -> BatchRow {
        let spec = self.spec_for(point);
        info!(combination = point.index + 1, total, params = %point.params, timeframe = %spec.timeframe_label(), "running");

        match run_backtest_from_data(&spec, data, self.registry) {
            Ok(result) => ok_row(point, &spec, &result),
            Err(e) => {
                warn!(combination = point.index + 1, params = %point.params, error = %e, "combination failed");
                BatchRow {
                    index: point.index,
                    params: point.params.clone(),
                    timeframe: timeframe_label(spec.timeframe),
                    metrics: None,
                    error: Some(e.to_string()),
                    exec_time_secs: 0.0,
                }
            }
        }
    }

    fn finish(&self, batch: &str, data: &LoadedData, rows: Vec<BatchRow>) -> BatchResults {
        BatchResults {
            batch: batch.to_string(),
            strategy: self.strategy.clone(),
            dataset_hash: data.dataset_hash.clone(),
            rows,
        }
    }
}

fn ok_row(point: &GridPoint, spec: &RunSpec, result: &BacktestResult) -> BatchRow {
    BatchRow {
        index: point.index,
        params: point.params.clone(),
        timeframe: spec.timeframe_label(),
        metrics: Some(RowMetrics::from(result)),
        error: None,
        exec_time_secs: result.exec_time_secs,
    }
}
