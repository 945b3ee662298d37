//! Discrete search space for randomized hyperparameter search

use crate::error::{MaintenanceError, Result};
use crate::training::ForestParams;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// One choice of a parameter. `None` is a real choice (e.g. unlimited depth).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    String(String),
    None,
}

impl ParameterValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::String(v) => f.write_str(v),
            ParameterValue::None => f.write_str("None"),
        }
    }
}

/// A sampled configuration, keyed by parameter name
pub type HyperParams = BTreeMap<String, ParameterValue>;

/// A named parameter and its discrete choices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub choices: Vec<ParameterValue>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, choices: Vec<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            choices,
        }
    }

    /// Integer choices
    pub fn ints(name: impl Into<String>, values: &[i64]) -> Self {
        Self::new(name, values.iter().map(|v| ParameterValue::Int(*v)).collect())
    }
}

/// Declarative table of parameters and their choices.
/// Grid points are addressed in mixed radix, last parameter fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::random_forest_default()
    }
}

impl SearchSpace {
    /// Create an empty search space
    pub fn new() -> Self {
        Self { parameters: Vec::new() }
    }

    /// Add a parameter to the search space
    pub fn add(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// The random forest space used by the training stage
    pub fn random_forest_default() -> Self {
        let str_value = |s: &str| ParameterValue::String(s.to_string());
        Self::new()
            .add(Parameter::ints("n_estimators", &[100, 200, 300, 400]))
            .add(Parameter::new(
                "max_depth",
                vec![
                    ParameterValue::None,
                    ParameterValue::Int(5),
                    ParameterValue::Int(10),
                    ParameterValue::Int(20),
                ],
            ))
            .add(Parameter::ints("min_samples_split", &[2, 5, 10]))
            .add(Parameter::ints("min_samples_leaf", &[1, 2, 4]))
            .add(Parameter::new(
                "max_features",
                vec![str_value("sqrt"), str_value("log2"), ParameterValue::None],
            ))
            .add(Parameter::new(
                "bootstrap",
                vec![ParameterValue::Bool(true), ParameterValue::Bool(false)],
            ))
    }

    /// Load a space from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON search space
    pub fn from_json(text: &str) -> Result<Self> {
        let space: Self = serde_json::from_str(text)?;
        space.validate()?;
        Ok(space)
    }

    /// Check the space is non-empty, names are unique and known, and every
    /// choice is type-correct for its parameter
    pub fn validate(&self) -> Result<()> {
        if self.parameters.is_empty() {
            return Err(MaintenanceError::ConfigError("search space has no parameters".to_string()));
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(MaintenanceError::ConfigError(format!(
                    "parameter {} declared twice",
                    param.name
                )));
            }
            if param.choices.is_empty() {
                return Err(MaintenanceError::ConfigError(format!(
                    "parameter {} has no choices",
                    param.name
                )));
            }
            let mut candidate = ForestParams::default();
            for choice in &param.choices {
                candidate.set(&param.name, choice)?;
            }
        }

        self.grid_size()?;
        Ok(())
    }

    /// Get all parameters
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of distinct configurations
    pub fn grid_size(&self) -> Result<usize> {
        self.parameters.iter().try_fold(1usize, |acc, p| {
            acc.checked_mul(p.choices.len())
                .ok_or_else(|| MaintenanceError::ConfigError("search grid is too large".to_string()))
        })
    }

    /// Configuration at a grid index
    pub fn config_at(&self, mut index: usize) -> HyperParams {
        let mut params = HyperParams::new();
        for param in self.parameters.iter().rev() {
            let n = param.choices.len();
            params.insert(param.name.clone(), param.choices[index % n].clone());
            index /= n;
        }
        params
    }

    /// Draw `n_iter` distinct configurations. When the grid has no more
    /// than `n_iter` points the whole grid is returned in index order.
    pub fn sample(&self, n_iter: usize, seed: u64) -> Result<Vec<HyperParams>> {
        self.validate()?;
        let grid = self.grid_size()?;

        if grid <= n_iter {
            return Ok((0..grid).map(|i| self.config_at(i)).collect());
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        Ok(rand::seq::index::sample(&mut rng, grid, n_iter)
            .into_iter()
            .map(|i| self.config_at(i))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_space() {
        let space = SearchSpace::random_forest_default();
        assert_eq!(space.len(), 6);
        assert_eq!(space.grid_size().unwrap(), 4 * 4 * 3 * 3 * 3 * 2);
        space.validate().unwrap();
    }

    #[test]
    fn test_sample_distinct_and_deterministic() {
        let space = SearchSpace::random_forest_default();
        let a = space.sample(20, 42).unwrap();
        let b = space.sample(20, 42).unwrap();
        assert_eq!(a.len(), 20);
        assert_eq!(a, b);

        for (i, x) in a.iter().enumerate() {
            for y in &a[i + 1..] {
                assert_ne!(x, y);
            }
        }
    }

    #[test]
    fn test_small_grid_enumerated() {
        let space = SearchSpace::new()
            .add(Parameter::ints("n_estimators", &[10, 20]))
            .add(Parameter::new(
                "bootstrap",
                vec![ParameterValue::Bool(true), ParameterValue::Bool(false)],
            ));
        let configs = space.sample(20, 1).unwrap();
        assert_eq!(configs.len(), 4);
        assert_eq!(configs[0]["n_estimators"], ParameterValue::Int(10));
        assert_eq!(configs[0]["bootstrap"], ParameterValue::Bool(true));
        assert_eq!(configs[1]["bootstrap"], ParameterValue::Bool(false));
        assert_eq!(configs[3]["n_estimators"], ParameterValue::Int(20));
    }

    #[test]
    fn test_json_round_trip() {
        let space = SearchSpace::random_forest_default();
        let json = serde_json::to_string(&space).unwrap();
        assert!(json.contains("null"));
        assert_eq!(SearchSpace::from_json(&json).unwrap(), space);
    }

    #[test]
    fn test_validation_errors() {
        let unknown = r#"{"parameters":[{"name":"learning_rate","choices":[1]}]}"#;
        assert!(SearchSpace::from_json(unknown).is_err());

        let wrong_type = r#"{"parameters":[{"name":"bootstrap","choices":["yes"]}]}"#;
        assert!(SearchSpace::from_json(wrong_type).is_err());

        let empty = r#"{"parameters":[{"name":"n_estimators","choices":[]}]}"#;
        assert!(SearchSpace::from_json(empty).is_err());

        assert!(SearchSpace::new().validate().is_err());
    }
}
