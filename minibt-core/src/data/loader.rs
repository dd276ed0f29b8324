//! Bar file loading.
//!
//! Input files are semicolon-delimited with no header row:
//!
//! ```text
//! 20241001 093100;20150.25;20152.00;20149.50;20151.75;312
//! ```
//!
//! Columns are `datetime, open, high, low, close, volume`, with `datetime`
//! formatted as `YYYYMMDD HHMMSS`. Rows must be strictly ascending in time.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::debug;

use crate::domain::bar::{check_ascending, Bar, BarError};

/// `chrono` format of the datetime column.
pub const DATETIME_FORMAT: &str = "%Y%m%d %H%M%S";

const COLUMN_COUNT: usize = 6;

/// Errors from reading a bar file. All are fatal to the run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open data file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: expected 6 columns, found {found}")]
    ColumnCount { line: u64, found: usize },
    #[error("line {line}: invalid datetime '{value}' (expected YYYYMMDD HHMMSS)")]
    Datetime { line: u64, value: String },
    #[error("line {line}: invalid {column} value '{value}'")]
    Number {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("invalid bar data: {0}")]
    Bar(#[from] BarError),
    #[error("data file contains no bars")]
    Empty,
}

/// Load every bar from a semicolon-delimited file.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(file)?;
    debug!(path = %path.display(), bars = bars.len(), "loaded bar file");
    Ok(bars)
}

/// Parse bars from any reader in the bar file format.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        // Tolerate blank trailing lines.
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if record.len() < COLUMN_COUNT {
            return Err(LoadError::ColumnCount {
                line,
                found: record.len(),
            });
        }

        let raw_ts = &record[0];
        let timestamp = NaiveDateTime::parse_from_str(raw_ts, DATETIME_FORMAT).map_err(|_| {
            LoadError::Datetime {
                line,
                value: raw_ts.to_string(),
            }
        })?;

        let open = parse_number(&record[1], line, "open")?;
        let high = parse_number(&record[2], line, "high")?;
        let low = parse_number(&record[3], line, "low")?;
        let close = parse_number(&record[4], line, "close")?;
        let volume = parse_number(&record[5], line, "volume")?;

        let bar = Bar::new(timestamp, open, high, low, close, volume);
        bar.validate()?;
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    check_ascending(&bars)?;
    Ok(bars)
}

fn parse_number(raw: &str, line: u64, column: &'static str) -> Result<f64, LoadError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LoadError::Number {
            line,
            column,
            value: raw.to_string(),
        })
}
