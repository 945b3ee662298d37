//! Standard scaling over feature matrices

use crate::error::{MaintenanceError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Fitted parameters for one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Column mean
    pub center: f64,
    /// Population standard deviation, 1.0 for constant columns
    pub scale: f64,
}

/// Z-score scaler: `(x - mean) / std`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn per-column mean and standard deviation
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| MaintenanceError::EmptyDataset("cannot fit scaler on zero rows".to_string()))?;
        let std = x.std_axis(Axis(0), 0.0);
        self.params = mean
            .iter()
            .zip(std.iter())
            .map(|(&center, &std)| ScalerParams {
                center,
                scale: if std > 0.0 && std.is_finite() { std } else { 1.0 },
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Apply the fitted scaling
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(MaintenanceError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(MaintenanceError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let center: Array1<f64> = self.params.iter().map(|p| p.center).collect();
        let scale: Array1<f64> = self.params.iter().map(|p| p.scale).collect();
        Ok((x - &center) / &scale)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
