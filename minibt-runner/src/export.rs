//! Export: CSV and JSON artifacts for single runs and batch tables.
//!
//! - **Batch table**: one CSV row per combination, or the whole table as JSON
//! - **Trade log**: one CSV row per closed trade
//! - **Single run**: pretty JSON with schema versioning
//!
//! Default file names carry a `YYYYmmdd_HHMMSS` stamp supplied by the caller.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;

use minibt_core::analyzers::{write_entries_csv, TradeLogEntry};

use crate::batch::{BatchResults, BatchRow};
use crate::runner::{BacktestResult, SCHEMA_VERSION};

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ─── Batch table ────────────────────────────────────────────────────

const METRIC_COLUMNS: [&str; 15] = [
    "timeframe",
    "status",
    "equity_final",
    "profit_factor",
    "avg_trade",
    "expectancy",
    "trades",
    "wins",
    "losses",
    "win_rate_pct",
    "gross_profit",
    "gross_loss",
    "max_dd_pct",
    "max_dd_cash",
    "exec_time_secs",
];

/// Render the batch table as CSV, rows in table order.
///
/// Columns: index, one column per parameter name seen in any row, then
/// [`METRIC_COLUMNS`] and a trailing `error`. Failed rows leave metric cells
/// empty.
pub fn export_batch_csv(results: &BatchResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    write_batch_rows(&mut wtr, results.rows.iter())?;
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write the batch table as CSV to `path`, creating parent directories.
pub fn write_batch_csv(results: &BatchResults, path: &Path) -> Result<()> {
    create_parent(path)?;
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    write_batch_rows(&mut wtr, results.rows.iter())?;
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn write_batch_rows<'a, W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    rows: impl Iterator<Item = &'a BatchRow> + Clone,
) -> Result<()> {
    let param_names: BTreeSet<&str> = rows.clone().flat_map(|r| r.params.keys()).collect();

    let mut header = vec!["index"];
    header.extend(param_names.iter().copied());
    header.extend(METRIC_COLUMNS);
    header.push("error");
    wtr.write_record(&header)?;

    for row in rows {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        record.push(row.index.to_string());
        for name in &param_names {
            record.push(row.params.get(name).map(|v| v.to_string()).unwrap_or_default());
        }
        record.push(row.timeframe.clone());
        record.push(row.status().to_string());
        match &row.metrics {
            Some(m) => {
                let p = &m.performance;
                record.push(format!("{:.2}", m.equity_final));
                record.push(format!("{:.4}", p.profit_factor));
                record.push(format!("{:.4}", p.avg_trade));
                record.push(format!("{:.4}", p.expectancy));
                record.push(p.trades.to_string());
                record.push(p.wins.to_string());
                record.push(p.losses.to_string());
                record.push(format!("{:.2}", m.win_rate_pct));
                record.push(format!("{:.2}", p.gross_profit));
                record.push(format!("{:.2}", p.gross_loss));
                record.push(format!("{:.4}", m.drawdown.max_pct));
                record.push(format!("{:.2}", m.drawdown.max_cash));
            }
            None => record.extend(std::iter::repeat(String::new()).take(12)),
        }
        record.push(format!("{:.3}", row.exec_time_secs));
        record.push(row.error.clone().unwrap_or_default());
        wtr.write_record(&record)?;
    }
    Ok(())
}

/// Serialize the batch table to pretty JSON.
pub fn export_batch_json(results: &BatchResults) -> Result<String> {
    serde_json::to_string_pretty(results).context("failed to serialize batch results to JSON")
}

/// `result_<batch>_<stamp>.csv`
pub fn default_batch_filename(batch: &str, now: NaiveDateTime) -> String {
    format!("result_{batch}_{}.csv", now.format(STAMP_FORMAT))
}

/// Default batch output path: beside the config file.
pub fn default_batch_path(config_path: &Path, batch: &str, now: NaiveDateTime) -> PathBuf {
    let dir = config_path.parent().unwrap_or_else(|| Path::new(""));
    dir.join(default_batch_filename(batch, now))
}

// ─── Trade log ──────────────────────────────────────────────────────

/// Render a trade log as CSV.
pub fn export_trades_csv(entries: &[TradeLogEntry]) -> Result<String> {
    let mut buf = Vec::new();
    write_entries_csv(entries, &mut buf).context("failed to write trade log CSV")?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}

/// `trades_<stamp>.csv`
pub fn default_trades_filename(now: NaiveDateTime) -> String {
    format!("trades_{}.csv", now.format(STAMP_FORMAT))
}

/// Save a trade log into `dir` (created if needed). Returns the file path.
pub fn save_trades_csv(entries: &[TradeLogEntry], dir: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create results dir: {}", dir.display()))?;
    let path = dir.join(default_trades_filename(now));
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    write_entries_csv(entries, file)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ─── Single run JSON ────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display())),
        _ => Ok(()),
    }
}
