//! Parameter values and sets shared by strategies and the batch runner.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A single parameter value as it appears in config files: a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Number(_) => None,
            ParamValue::Text(s) => Some(s),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Number(_) => "number",
            ParamValue::Text(_) => "string",
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl fmt::Display for ParamValue {
    /// Integral numbers print without a fractional part (`30`, not `30.0`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{}", *v as i64)
            }
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParamError {
    #[error("missing required parameter '{0}'")]
    Missing(String),
    #[error("parameter '{name}' must be {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: String,
    },
    #[error("parameter '{name}' out of range: {message}")]
    OutOfRange { name: String, message: String },
    #[error("unknown parameter '{name}' (accepted: {accepted})")]
    Unknown { name: String, accepted: String },
}

/// Ordered name → value map. Iteration order is lexicographic by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(name.to_string(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Copy every entry of `overrides` into self, replacing on collision.
    pub fn merge(&mut self, overrides: &ParamSet) {
        for (k, v) in &overrides.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Numeric value if present; error if present with the wrong type.
    pub fn get_f64(&self, name: &str) -> Result<Option<f64>, ParamError> {
        match self.0.get(name) {
            None => Ok(None),
            Some(ParamValue::Number(v)) => Ok(Some(*v)),
            Some(other) => Err(ParamError::WrongType {
                name: name.to_string(),
                expected: "a number",
                found: format!("{} '{other}'", other.kind()),
            }),
        }
    }

    /// Non-negative whole number if present.
    pub fn get_usize(&self, name: &str) -> Result<Option<usize>, ParamError> {
        match self.get_f64(name)? {
            None => Ok(None),
            Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64 => {
                Ok(Some(v as usize))
            }
            Some(v) => Err(ParamError::WrongType {
                name: name.to_string(),
                expected: "a non-negative integer",
                found: v.to_string(),
            }),
        }
    }

    /// Reject names outside `accepted`.
    pub fn check_known(&self, accepted: &[&str]) -> Result<(), ParamError> {
        match self.keys().find(|k| !accepted.contains(k)) {
            Some(name) => Err(ParamError::Unknown {
                name: name.to_string(),
                accepted: accepted.join(", "),
            }),
            None => Ok(()),
        }
    }
}

impl FromIterator<(String, ParamValue)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}
