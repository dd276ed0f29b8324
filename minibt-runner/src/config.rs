//! Batch configuration files.
//!
//! A batch file names the strategy and data file once, then declares any
//! number of named batches, each with fixed parameters and candidate lists
//! for the parameters to sweep:
//!
//! ```json
//! {
//!   "global": { "strategy": "sma_test", "datafile": "data/MNQ.txt" },
//!   "batches": {
//!     "sma": {
//!       "name": "SMA period sweep",
//!       "fixed": { "timeframe": 30, "stop_points": 20 },
//!       "variable": { "sma_period": [5, 10, 20] }
//!     }
//!   }
//! }
//! ```
//!
//! JSON and TOML are both accepted; the format follows the file extension.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use minibt_core::data::{Timeframe, TimeframeError};
use minibt_core::engine::EngineConfig;
use minibt_core::strategy::{ParamSet, ParamValue};

/// Errors raised while reading or interpreting a batch file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid TOML in '{path}': {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unsupported config format '{0}' (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),
    #[error("batch '{name}' not found (available: {available})")]
    UnknownBatch { name: String, available: String },
    #[error("invalid timeframe '{value}': {source}")]
    Timeframe {
        value: String,
        #[source]
        source: TimeframeError,
    },
}

/// Settings shared by every batch in a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub strategy: String,
    pub datafile: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_cash: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_size: Option<f64>,
    /// Base timeframe for combinations that do not set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
}

/// One named sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSpec {
    /// Human-readable title; the map key is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fixed: ParamSet,
    #[serde(default)]
    pub variable: BTreeMap<String, Vec<ParamValue>>,
}

/// A parsed batch configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    pub global: GlobalConfig,
    #[serde(default)]
    pub batches: BTreeMap<String, BatchSpec>,
    /// Directory the file was read from, for resolving relative paths.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl BatchFile {
    /// Read a batch file, picking the parser from the extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let mut file = match extension.as_deref() {
            Some("json") => Self::from_json_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?,
            Some("toml") => Self::from_toml_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        file.base_dir = path.parent().map(Path::to_path_buf);
        Ok(file)
    }

    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn batch(&self, name: &str) -> Result<&BatchSpec, ConfigError> {
        self.batches
            .get(name)
            .ok_or_else(|| ConfigError::UnknownBatch {
                name: name.to_string(),
                available: self.batch_names().join(", "),
            })
    }

    pub fn batch_names(&self) -> Vec<&str> {
        self.batches.keys().map(String::as_str).collect()
    }

    /// Engine settings with the file's overrides applied to the defaults.
    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            initial_cash: self.global.initial_cash.unwrap_or(defaults.initial_cash),
            commission: self.global.commission.unwrap_or(defaults.commission),
            order_size: self.global.order_size.unwrap_or(defaults.order_size),
        }
    }

    /// Directory of the config file, when it came from disk.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Data file location.
    ///
    /// Absolute paths are used as-is. A relative path is taken from the
    /// working directory if it exists there, otherwise from the config
    /// file's directory.
    pub fn resolve_datafile(&self) -> PathBuf {
        let datafile = &self.global.datafile;
        if datafile.is_absolute() || datafile.exists() {
            return datafile.clone();
        }
        match &self.base_dir {
            Some(dir) => dir.join(datafile),
            None => datafile.clone(),
        }
    }
}

impl BatchSpec {
    /// Title for display: `name` if set, otherwise `key`.
    pub fn title<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }
}

/// Interpret a parameter value as a timeframe: `30`, `"30"` or `"30m"`.
pub fn timeframe_from_param(value: &ParamValue) -> Result<Timeframe, ConfigError> {
    match value {
        ParamValue::Number(v) => Timeframe::from_f64(*v).map_err(|source| ConfigError::Timeframe {
            value: value.to_string(),
            source,
        }),
        ParamValue::Text(s) => s.parse().map_err(|source| ConfigError::Timeframe {
            value: s.clone(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_JSON: &str = r#"{
        "global": { "strategy": "sma_test", "datafile": "data/MNQ.txt" },
        "batches": {
            "sma": {
                "name": "SMA period sweep",
                "fixed": { "timeframe": 30, "stop_points": 20 },
                "variable": { "sma_period": [5, 10, 20] }
            },
            "stops": {
                "variable": { "stop_points": [10, 20], "timeframe": ["5m", "15m"] }
            }
        }
    }"#;

    const SAMPLE_TOML: &str = r#"
[global]
strategy = "sma_test"
datafile = "data/MNQ.txt"
commission = 2.5

[batches.sma]
name = "SMA period sweep"
fixed = { timeframe = 30, stop_points = 20 }
variable = { sma_period = [5, 10, 20] }
"#;

    #[test]
    fn parses_json() {
        let file = BatchFile::from_json_str(SAMPLE_JSON).unwrap();
        assert_eq!(file.global.strategy, "sma_test");
        assert_eq!(file.batch_names(), vec!["sma", "stops"]);

        let sma = file.batch("sma").unwrap();
        assert_eq!(sma.title("sma"), "SMA period sweep");
        assert_eq!(sma.fixed.get_f64("timeframe").unwrap(), Some(30.0));
        assert_eq!(sma.variable["sma_period"].len(), 3);

        let stops = file.batch("stops").unwrap();
        assert_eq!(stops.title("stops"), "stops");
        assert!(stops.fixed.is_empty());
    }

    #[test]
    fn toml_matches_json() {
        let toml = BatchFile::from_toml_str(SAMPLE_TOML).unwrap();
        let json = BatchFile::from_json_str(SAMPLE_JSON).unwrap();
        assert_eq!(toml.batch("sma").unwrap(), json.batch("sma").unwrap());
        assert_eq!(toml.engine_config().commission, 2.5);
        assert_eq!(json.engine_config(), EngineConfig::default());
    }

    #[test]
    fn unknown_batch_lists_available() {
        let file = BatchFile::from_json_str(SAMPLE_JSON).unwrap();
        let err = file.batch("nope").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBatch { .. }));
        assert!(err.to_string().contains("sma, stops"));
    }

    #[test]
    fn format_follows_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("cfg.json");
        std::fs::File::create(&json_path)
            .unwrap()
            .write_all(SAMPLE_JSON.as_bytes())
            .unwrap();
        let file = BatchFile::from_file(&json_path).unwrap();
        assert_eq!(file.base_dir(), Some(dir.path()));

        let toml_path = dir.path().join("cfg.toml");
        std::fs::write(&toml_path, SAMPLE_TOML).unwrap();
        assert!(BatchFile::from_file(&toml_path).is_ok());

        let yaml_path = dir.path().join("cfg.yaml");
        std::fs::write(&yaml_path, "x: 1").unwrap();
        assert!(matches!(
            BatchFile::from_file(&yaml_path),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        let bad_path = dir.path().join("bad.json");
        std::fs::write(&bad_path, "{").unwrap();
        assert!(matches!(
            BatchFile::from_file(&bad_path),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn datafile_resolves_beside_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(
            &path,
            r#"{"global": {"strategy": "sma_test", "datafile": "minibt_missing_data_file.txt"}}"#,
        )
        .unwrap();
        let file = BatchFile::from_file(&path).unwrap();
        assert_eq!(
            file.resolve_datafile(),
            dir.path().join("minibt_missing_data_file.txt")
        );
        assert!(file.batches.is_empty());
    }

    #[test]
    fn timeframe_values() {
        assert_eq!(
            timeframe_from_param(&ParamValue::Number(30.0)).unwrap().minutes(),
            30
        );
        assert_eq!(
            timeframe_from_param(&ParamValue::Text("15m".into())).unwrap().minutes(),
            15
        );
        assert!(timeframe_from_param(&ParamValue::Number(2.5)).is_err());
        assert!(timeframe_from_param(&ParamValue::Text("1h".into())).is_err());
    }
}
