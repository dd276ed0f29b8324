//! Cartesian parameter grid.
//!
//! Keys are visited in lexicographic order and the last key varies fastest,
//! so `{a: [1, 2], b: [x, y]}` yields `(1,x) (1,y) (2,x) (2,y)`.

use std::collections::BTreeMap;

use serde::Serialize;

use minibt_core::data::Timeframe;
use minibt_core::strategy::{ParamSet, ParamValue};

use crate::config::{timeframe_from_param, BatchSpec, ConfigError};

/// Parameter name that selects the bar timeframe instead of feeding the strategy.
pub const TIMEFRAME_KEY: &str = "timeframe";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGrid {
    fixed: ParamSet,
    variable: BTreeMap<String, Vec<ParamValue>>,
}

/// One resolved combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPoint {
    /// Position in generation order.
    pub index: usize,
    /// Merged fixed + variable values, without the timeframe.
    pub params: ParamSet,
    /// Timeframe requested by this combination, if any.
    pub timeframe: Option<Timeframe>,
}

impl ParameterGrid {
    pub fn new(fixed: ParamSet, variable: BTreeMap<String, Vec<ParamValue>>) -> Self {
        Self { fixed, variable }
    }

    pub fn from_batch(spec: &BatchSpec) -> Self {
        Self::new(spec.fixed.clone(), spec.variable.clone())
    }

    pub fn fixed(&self) -> &ParamSet {
        &self.fixed
    }

    pub fn variable(&self) -> &BTreeMap<String, Vec<ParamValue>> {
        &self.variable
    }

    /// Product of the candidate list lengths; 1 for an empty variable map.
    pub fn combination_count(&self) -> usize {
        self.variable.values().map(Vec::len).product()
    }

    /// Merged parameter sets in generation order. Variable values override
    /// fixed ones on key collision.
    pub fn combinations(&self) -> Vec<ParamSet> {
        let keys: Vec<&String> = self.variable.keys().collect();
        let lists: Vec<&Vec<ParamValue>> = self.variable.values().collect();
        let total = self.combination_count();

        let mut out = Vec::with_capacity(total);
        for n in 0..total {
            let mut params = self.fixed.clone();
            // Mixed-radix decode of n, last key least significant.
            let mut rem = n;
            let mut picks = vec![0usize; lists.len()];
            for (slot, list) in lists.iter().enumerate().rev() {
                picks[slot] = rem % list.len();
                rem /= list.len();
            }
            for ((key, list), pick) in keys.iter().zip(&lists).zip(picks) {
                params.insert(key, list[pick].clone());
            }
            out.push(params);
        }
        out
    }

    /// Combinations with the timeframe pulled out and validated.
    ///
    /// Every timeframe is checked before anything runs, so a malformed value
    /// anywhere in the grid fails the whole batch up front.
    pub fn points(&self) -> Result<Vec<GridPoint>, ConfigError> {
        self.combinations()
            .into_iter()
            .enumerate()
            .map(|(index, mut params)| {
                let timeframe = params
                    .remove(TIMEFRAME_KEY)
                    .map(|v| timeframe_from_param(&v))
                    .transpose()?;
                Ok(GridPoint {
                    index,
                    params,
                    timeframe,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Vec<ParamValue> {
        values.iter().map(|v| ParamValue::Number(*v)).collect()
    }

    #[test]
    fn empty_variable_map_yields_fixed_only() {
        let fixed = ParamSet::new().with("sma_period", 30.0);
        let grid = ParameterGrid::new(fixed.clone(), BTreeMap::new());
        assert_eq!(grid.combination_count(), 1);
        assert_eq!(grid.combinations(), vec![fixed]);
    }

    #[test]
    fn last_key_varies_fastest() {
        let mut variable = BTreeMap::new();
        variable.insert("a".to_string(), nums(&[1.0, 2.0]));
        variable.insert("b".to_string(), nums(&[10.0, 20.0, 30.0]));
        let grid = ParameterGrid::new(ParamSet::new(), variable);

        let combos = grid.combinations();
        assert_eq!(combos.len(), 6);
        let pairs: Vec<(f64, f64)> = combos
            .iter()
            .map(|p| {
                (
                    p.get_f64("a").unwrap().unwrap(),
                    p.get_f64("b").unwrap().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                (1.0, 10.0),
                (1.0, 20.0),
                (1.0, 30.0),
                (2.0, 10.0),
                (2.0, 20.0),
                (2.0, 30.0)
            ]
        );
    }

    #[test]
    fn variable_overrides_fixed() {
        let fixed = ParamSet::new().with("stop_points", 5.0).with("sma_period", 30.0);
        let mut variable = BTreeMap::new();
        variable.insert("stop_points".to_string(), nums(&[10.0, 20.0]));
        let grid = ParameterGrid::new(fixed, variable);

        let combos = grid.combinations();
        assert_eq!(combos.len(), 2);
        for (combo, expected) in combos.iter().zip([10.0, 20.0]) {
            assert_eq!(combo.get_f64("sma_period").unwrap(), Some(30.0));
            assert_eq!(combo.get_f64("stop_points").unwrap(), Some(expected));
        }
    }

    #[test]
    fn empty_candidate_list_yields_nothing() {
        let mut variable = BTreeMap::new();
        variable.insert("a".to_string(), nums(&[1.0, 2.0]));
        variable.insert("b".to_string(), Vec::new());
        let grid = ParameterGrid::new(ParamSet::new(), variable);
        assert_eq!(grid.combination_count(), 0);
        assert!(grid.combinations().is_empty());
    }

    #[test]
    fn timeframe_is_extracted() {
        let fixed = ParamSet::new().with("sma_period", 30.0);
        let mut variable = BTreeMap::new();
        variable.insert(
            TIMEFRAME_KEY.to_string(),
            vec![ParamValue::Number(5.0), ParamValue::Text("15m".into())],
        );
        let points = ParameterGrid::new(fixed, variable).points().unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timeframe.map(|t| t.minutes()), Some(5));
        assert_eq!(points[1].timeframe.map(|t| t.minutes()), Some(15));
        assert!(!points[0].params.contains(TIMEFRAME_KEY));
        assert_eq!(points[1].index, 1);
    }

    #[test]
    fn bad_timeframe_fails_up_front() {
        let fixed = ParamSet::new().with(TIMEFRAME_KEY, "fast");
        let err = ParameterGrid::new(fixed, BTreeMap::new()).points().unwrap_err();
        assert!(matches!(err, ConfigError::Timeframe { .. }));
    }
}
