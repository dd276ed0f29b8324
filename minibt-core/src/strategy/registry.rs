//! Name → constructor lookup for strategies.

use thiserror::Error;

use super::params::{ParamError, ParamSet};
use super::{sma_test, Strategy};

/// Builds a fresh strategy instance from validated parameters.
pub type StrategyCtor = fn(&ParamSet) -> Result<Box<dyn Strategy>, ParamError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    #[error("strategy '{name}' is not registered (available: {available})")]
    UnknownStrategy { name: String, available: String },
    #[error("invalid parameters for strategy '{strategy}': {source}")]
    InvalidParams {
        strategy: String,
        #[source]
        source: ParamError,
    },
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub name: &'static str,
    pub description: &'static str,
    ctor: StrategyCtor,
}

/// Explicit registry; nothing is discovered implicitly.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    entries: Vec<RegistryEntry>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every bundled strategy.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            sma_test::NAME,
            "SMA entry with fixed stop (points) and R-multiple target",
            |params| Ok(Box::new(sma_test::SmaTest::from_params(params)?)),
        );
        registry
    }

    /// Later registrations under the same name replace earlier ones.
    pub fn register(&mut self, name: &'static str, description: &'static str, ctor: StrategyCtor) {
        self.entries.retain(|e| e.name != name);
        self.entries.push(RegistryEntry {
            name,
            description,
            ctor,
        });
        self.entries.sort_by_key(|e| e.name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    /// Resolve a name without building, for up-front config validation.
    pub fn resolve(&self, name: &str) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| RegistryError::UnknownStrategy {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn build(&self, name: &str, params: &ParamSet) -> Result<Box<dyn Strategy>, RegistryError> {
        let entry = self.resolve(name)?;
        (entry.ctor)(params).map_err(|source| RegistryError::InvalidParams {
            strategy: name.to_string(),
            source,
        })
    }
}
