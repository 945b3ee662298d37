//! Scaler + random forest pipeline

use super::random_forest::{ForestParams, RandomForest};
use crate::error::{MaintenanceError, Result};
use crate::preprocessing::{StandardScaler, FEATURE_COLUMNS};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Decision threshold on the positive-class probability
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Fitted standard scaler composed with a fitted random forest.
/// Input columns must follow [`FEATURE_COLUMNS`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenancePipeline {
    feature_names: Vec<String>,
    scaler: StandardScaler,
    forest: RandomForest,
}

impl MaintenancePipeline {
    /// Fit the scaler and then the forest on the scaled matrix
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: &ForestParams, random_state: u64) -> Result<Self> {
        if x.ncols() != FEATURE_COLUMNS.len() {
            return Err(MaintenanceError::ShapeError {
                expected: format!("{} features", FEATURE_COLUMNS.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(x)?;

        let mut forest = RandomForest::new(params.clone()).with_random_state(random_state);
        forest.fit(&scaled, y)?;

        Ok(Self {
            feature_names: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            scaler,
            forest,
        })
    }

    /// Probability of label 1 per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scaled = self.scaler.transform(x)?;
        self.forest.predict_proba(&scaled)
    }

    /// Labels at [`DECISION_THRESHOLD`]
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p >= DECISION_THRESHOLD { 1.0 } else { 0.0 }))
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn params(&self) -> &ForestParams {
        &self.forest.params
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}
