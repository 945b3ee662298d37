//! Random Forest classifier

use super::decision_tree::DecisionTree;
use crate::error::{MaintenanceError, Result};
use crate::optimizer::{HyperParams, ParameterValue};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// floor(sqrt(n_features))
    Sqrt,
    /// floor(log2(n_features))
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` (at least 1)
    pub fn resolve(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fixed(n) => (*n).min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

/// Forest hyperparameters, the target of a sampled search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    /// Defaults overridden by every key in `params`
    pub fn from_hyperparams(params: &HyperParams) -> Result<Self> {
        let mut forest = Self::default();
        for (name, value) in params {
            forest.set(name, value)?;
        }
        Ok(forest)
    }

    /// Apply one named parameter, checking its type and range
    pub fn set(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        let invalid = || {
            MaintenanceError::ConfigError(format!("invalid value {} for parameter {}", value, name))
        };
        let positive = |min: i64| match value {
            ParameterValue::Int(v) if *v >= min => Ok(*v as usize),
            _ => Err(invalid()),
        };

        match name {
            "n_estimators" => self.n_estimators = positive(1)?,
            "max_depth" => {
                self.max_depth = match value {
                    ParameterValue::None => None,
                    _ => Some(positive(1)?),
                }
            }
            "min_samples_split" => self.min_samples_split = positive(2)?,
            "min_samples_leaf" => self.min_samples_leaf = positive(1)?,
            "max_features" => {
                self.max_features = match value {
                    ParameterValue::None => MaxFeatures::All,
                    ParameterValue::String(s) if s == "sqrt" => MaxFeatures::Sqrt,
                    ParameterValue::String(s) if s == "log2" => MaxFeatures::Log2,
                    ParameterValue::Int(_) => MaxFeatures::Fixed(positive(1)?),
                    _ => return Err(invalid()),
                }
            }
            "bootstrap" => {
                self.bootstrap = match value {
                    ParameterValue::Bool(b) => *b,
                    _ => return Err(invalid()),
                }
            }
            other => {
                return Err(MaintenanceError::ConfigError(format!(
                    "unknown random forest parameter '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub params: ForestParams,
    /// Base seed; tree `i` uses `random_state + i`
    pub random_state: u64,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            trees: Vec::new(),
            params,
            random_state: 42,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the forest. Labels must be 0.0 or 1.0.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(MaintenanceError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(MaintenanceError::EmptyDataset("cannot fit a forest on zero rows".to_string()));
        }
        if self.params.n_estimators == 0 {
            return Err(MaintenanceError::ConfigError("n_estimators must be at least 1".to_string()));
        }

        self.n_features = n_features;
        let max_features = self.params.max_features.resolve(n_features);
        let params = &self.params;
        let base_seed = self.random_state;

        // Trees are built in parallel; collect keeps them in index order
        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let mut tree = DecisionTree::new()
                    .with_max_depth(params.max_depth)
                    .with_min_samples_split(params.min_samples_split)
                    .with_min_samples_leaf(params.min_samples_leaf)
                    .with_max_features(Some(max_features))
                    .with_random_state(rng.next_u64());

                if params.bootstrap {
                    let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                    let x_boot = x.select(Axis(0), &sample);
                    let y_boot = y.select(Axis(0), &sample);
                    tree.fit(&x_boot, &y_boot)?;
                } else {
                    tree.fit(x, y)?;
                }
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();
        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (acc, v) in total.iter_mut().zip(imp.iter()) {
                    *acc += v;
                }
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            total.iter_mut().for_each(|v| *v /= sum);
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Positive-class probability: mean of the trees' leaf fractions
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(MaintenanceError::ModelNotFitted);
        }

        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;

        let mut sum: Array1<f64> = Array1::zeros(x.nrows());
        for proba in &per_tree {
            sum += proba;
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Class labels at threshold 0.5
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}
