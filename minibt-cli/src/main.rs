//! MiniBT CLI: single runs, batch sweeps and config discovery.
//!
//! Commands:
//! - `run`: one backtest on a bar file (or `--synthetic` data)
//! - `batch`: sweep a named batch from a JSON/TOML config file
//! - `list`: show config files in a folder and the batches they define
//! - `strategies`: list registered strategies

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use minibt_core::data::{Timeframe, TimeframeError};
use minibt_core::engine::EngineConfig;
use minibt_core::strategy::{ParamSet, ParamValue, StrategyRegistry};
use minibt_runner::export::{default_batch_path, export_json, save_trades_csv};
use minibt_runner::{
    load_data, run_single_backtest, BacktestResult, BatchFile, BatchResults, BatchRunner,
    DataSource, ParameterGrid, RankMetric, RunSpec,
};

#[derive(Parser)]
#[command(name = "minibt", about = "MiniBT: single-instrument backtester with batch sweeps")]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest.
    Run {
        /// Semicolon-delimited bar file.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Use a seeded random walk of 1-minute bars instead of a file.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Number of synthetic bars.
        #[arg(long, default_value_t = 5_000)]
        bars: usize,

        /// Seed for synthetic data.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Registered strategy name.
        #[arg(long, default_value = "sma_test")]
        strategy: String,

        /// Strategy parameter as key=value (repeatable).
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,

        /// Bar timeframe, e.g. 5m. Defaults to the native period of the data.
        #[arg(short, long, value_parser = parse_timeframe)]
        timeframe: Option<Timeframe>,

        /// Starting cash.
        #[arg(long)]
        cash: Option<f64>,

        /// Round-turn commission per contract.
        #[arg(long)]
        commission: Option<f64>,

        /// Print every closed trade.
        #[arg(long, default_value_t = false)]
        show_trades: bool,

        /// Save the trade log as CSV under --results-dir.
        #[arg(long, default_value_t = false)]
        save_trades: bool,

        /// Output directory for trade logs.
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,

        /// Print the full result as JSON instead of the summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run every parameter combination of a named batch.
    Batch {
        /// Batch name inside the config file.
        batch: String,

        /// Batch config file (.json or .toml).
        config: PathBuf,

        /// Result CSV path. Defaults to result_<batch>_<timestamp>.csv beside the config.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run combinations on all cores.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Abort on the first failing combination.
        #[arg(long, default_value_t = false)]
        fail_fast: bool,

        /// Metric for the best-of list.
        #[arg(long, default_value = "equity_final")]
        rank_by: RankMetric,

        /// Size of the best-of list.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// List batch config files in a folder.
    List {
        /// Folder to scan.
        #[arg(default_value = ".")]
        folder: PathBuf,
    },
    /// List registered strategies.
    Strategies,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let registry = StrategyRegistry::with_defaults();

    match cli.command {
        Commands::Run {
            data,
            synthetic,
            bars,
            seed,
            strategy,
            params,
            timeframe,
            cash,
            commission,
            show_trades,
            save_trades,
            results_dir,
            json,
        } => {
            let source = match (data, synthetic) {
                (Some(_), true) => bail!("--data and --synthetic are mutually exclusive"),
                (None, false) => bail!("one of --data or --synthetic is required"),
                (Some(path), false) => DataSource::File(path),
                (None, true) => DataSource::Synthetic { bars, seed },
            };
            let defaults = EngineConfig::default();
            let engine = EngineConfig {
                initial_cash: cash.unwrap_or(defaults.initial_cash),
                commission: commission.unwrap_or(defaults.commission),
                ..defaults
            };
            let spec = RunSpec::new(strategy)
                .with_params(params.into_iter().collect())
                .with_timeframe(timeframe)
                .with_engine(engine);
            run_cmd(&registry, &spec, &source, show_trades, save_trades.then_some(results_dir.as_path()), json)
        }
        Commands::Batch {
            batch,
            config,
            output,
            parallel,
            fail_fast,
            rank_by,
            top,
        } => batch_cmd(&registry, &batch, &config, output, parallel, fail_fast, rank_by, top),
        Commands::List { folder } => list_cmd(&folder),
        Commands::Strategies => {
            println!("Registered strategies:");
            for entry in registry.entries() {
                println!("  {:<12} {}", entry.name, entry.description);
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Argument parsing ───────────────────────────────────────────────

/// `key=value`; numeric values become numbers, anything else stays text.
fn parse_param(s: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{s}'"));
    }
    let value = value.trim();
    let value = match value.parse::<f64>() {
        Ok(v) => ParamValue::Number(v),
        Err(_) => ParamValue::Text(value.to_string()),
    };
    Ok((key.to_string(), value))
}

fn parse_timeframe(s: &str) -> Result<Timeframe, TimeframeError> {
    s.parse()
}

fn warn_if_uncommon(timeframe: Timeframe) {
    if !timeframe.is_common() {
        warn!(
            timeframe = %timeframe,
            "uncommon timeframe; usual values are 1m, 5m, 10m, 15m, 30m, 60m"
        );
    }
}

// ─── run ────────────────────────────────────────────────────────────

fn run_cmd(
    registry: &StrategyRegistry,
    spec: &RunSpec,
    source: &DataSource,
    show_trades: bool,
    save_trades_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    if let Some(tf) = spec.timeframe {
        warn_if_uncommon(tf);
    }

    let result = run_single_backtest(spec, source, registry)
        .with_context(|| format!("backtest failed on {}", source.describe()))?;

    if json {
        println!("{}", export_json(&result)?);
    } else {
        print_summary(&result, source);
        if show_trades {
            print_trades(&result);
        }
    }

    if let Some(dir) = save_trades_dir {
        let now = chrono::Local::now().naive_local();
        let path = save_trades_csv(&result.trade_log, dir, now)?;
        info!(path = %path.display(), trades = result.trade_log.len(), "trade log saved");
    }
    Ok(())
}

fn print_summary(result: &BacktestResult, source: &DataSource) {
    let info = &result.data_info;
    let m = &result.metrics;
    let dd = &result.drawdown;

    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {} {}", result.strategy, result.params);
    println!("Data:           {}", source.describe());
    match (info.start, info.end) {
        (Some(start), Some(end)) => {
            println!("Period:         {start} to {end} ({} days)", info.days)
        }
        _ => println!("Period:         (no bars)"),
    }
    println!(
        "Timeframe:      {} ({} source bars -> {} bars)",
        info.timeframe, info.source_bars, info.engine_bars
    );
    println!("Dataset hash:   {}", &result.dataset_hash[..16.min(result.dataset_hash.len())]);
    println!();
    println!("--- Performance ---");
    println!("Equity Start:   {:.2}", result.equity_start);
    println!("Equity Final:   {:.2}", result.equity_end);
    println!("Net PnL:        {:.2}", result.net_pnl());
    println!("Trades:         {} ({} won, {} lost)", m.trades, m.wins, m.losses);
    println!("Win Rate:       {:.1}%", result.win_rate_pct());
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Avg Trade:      {:.2}", m.avg_trade);
    println!("Expectancy:     {:.2}", m.expectancy);
    println!("Max Drawdown:   {:.2}% ({:.2})", dd.max_pct, dd.max_cash);
    println!("Exec Time:      {:.3}s", result.exec_time_secs);
    if let Some(pos) = &result.open_position {
        println!();
        println!(
            "NOTE: position still open at end ({} x {:.2})",
            pos.size, pos.entry_price
        );
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_trades(result: &BacktestResult) {
    println!(
        "{:>5}  {:<10}  {:<8}  {:<5}  {:>9}  {:>10}  {:>10}  {:>10}",
        "#", "Date", "Time", "Side", "Contracts", "Gross", "Comm", "Net"
    );
    for e in &result.trade_log {
        println!(
            "{:>5}  {:<10}  {:<8}  {:<5}  {:>9}  {:>10.2}  {:>10.2}  {:>10.2}",
            e.trade_id,
            e.close_date.to_string(),
            e.close_time.to_string(),
            e.direction.label(),
            e.contracts,
            e.gross_pnl,
            e.commission,
            e.net_pnl
        );
    }
    println!();
}

// ─── batch ──────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn batch_cmd(
    registry: &StrategyRegistry,
    batch: &str,
    config_path: &Path,
    output: Option<PathBuf>,
    parallel: bool,
    fail_fast: bool,
    rank_by: RankMetric,
    top: usize,
) -> Result<()> {
    let file = BatchFile::from_file(config_path)?;
    let spec = file.batch(batch)?;
    let grid = ParameterGrid::from_batch(spec);

    let frames: BTreeSet<Timeframe> = grid
        .points()?
        .iter()
        .filter_map(|p| p.timeframe)
        .chain(file.global.timeframe)
        .collect();
    frames.into_iter().for_each(warn_if_uncommon);

    let datafile = file.resolve_datafile();
    let data = load_data(&DataSource::File(datafile.clone()))
        .with_context(|| format!("failed to load data file {}", datafile.display()))?;

    println!(
        "Batch '{}' ({}): {} combinations of {}",
        batch,
        spec.title(batch),
        grid.combination_count(),
        file.global.strategy
    );

    let runner = BatchRunner::new(registry, file.global.strategy.as_str())
        .with_engine(file.engine_config())
        .with_base_timeframe(file.global.timeframe)
        .with_parallelism(parallel);
    let results = if fail_fast {
        runner.run_fail_fast(batch, &grid, &data)?
    } else {
        runner.run(batch, &grid, &data)?
    };

    print_table(&results);

    let path = output.unwrap_or_else(|| {
        default_batch_path(config_path, batch, chrono::Local::now().naive_local())
    });
    results.save_results(&path)?;
    println!("Results saved to: {}", path.display());

    let best = results.get_best(rank_by, top);
    if !best.is_empty() {
        println!();
        println!("Top {} by {}:", best.len(), rank_by.title());
        for (rank, row) in best.iter().enumerate() {
            let value = row.metric(rank_by).unwrap_or(f64::NAN);
            println!(
                "  {}. [{}] {} @ {} -> {:.2}",
                rank + 1,
                row.index,
                row.params,
                row.timeframe,
                value
            );
        }
    }

    let failed = results.len() - results.ok_count();
    if failed > 0 {
        warn!(failed, "some combinations failed; see the error column");
    }
    Ok(())
}

/// Full table ordered by final equity, failed rows last.
fn print_table(results: &BatchResults) {
    println!();
    println!(
        "{:>4}  {:<40}  {:>5}  {:>12}  {:>8}  {:>9}  {:>6}  {:>6}  {:>8}",
        "#", "Params", "TF", "Equity Final", "PF", "Avg Trade", "Trades", "Win %", "Max DD %"
    );
    for row in results.sorted_by(RankMetric::EquityFinal) {
        let params = row.params.to_string();
        match &row.metrics {
            Some(m) => println!(
                "{:>4}  {:<40}  {:>5}  {:>12.2}  {:>8.2}  {:>9.2}  {:>6}  {:>6.1}  {:>8.2}",
                row.index,
                params,
                row.timeframe,
                m.equity_final,
                m.performance.profit_factor,
                m.performance.avg_trade,
                m.performance.trades,
                m.win_rate_pct,
                m.drawdown.max_pct
            ),
            None => println!(
                "{:>4}  {:<40}  {:>5}  FAILED: {}",
                row.index,
                params,
                row.timeframe,
                row.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

// ─── list ───────────────────────────────────────────────────────────

fn list_cmd(folder: &Path) -> Result<()> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(folder)
        .with_context(|| format!("failed to read folder {}", folder.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("json") | Some("toml")
            )
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        println!("No config files (.json/.toml) in {}", folder.display());
        return Ok(());
    }

    for path in &paths {
        match BatchFile::from_file(path) {
            Ok(file) => {
                println!(
                    "{}  (strategy: {}, data: {})",
                    path.display(),
                    file.global.strategy,
                    file.global.datafile.display()
                );
                for (key, spec) in &file.batches {
                    let combos = ParameterGrid::from_batch(spec).combination_count();
                    println!("  {:<16} {:<32} {} combinations", key, spec.title(key), combos);
                }
            }
            Err(e) => println!("{}  (not a batch config: {e})", path.display()),
        }
    }
    Ok(())
}
