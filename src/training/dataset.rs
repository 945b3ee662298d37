//! DataFrame → ndarray conversion for prepared partitions

use crate::error::{MaintenanceError, Result};
use crate::preprocessing::{FEATURE_COLUMNS, N_FEATURES, TARGET_COLUMN};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Feature matrix and labels of one partition, in canonical column order
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub x: Array2<f64>,
    /// Labels as 0.0 / 1.0
    pub y: Array1<f64>,
}

impl TrainingData {
    /// Extract canonical features and the label from a prepared partition
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let n = df.height();
        if n == 0 {
            return Err(MaintenanceError::EmptyDataset("partition has no rows".to_string()));
        }

        let mut data = vec![0.0; n * N_FEATURES];
        for (c, name) in FEATURE_COLUMNS.iter().enumerate() {
            let values = float_column(df, name)?;
            for (r, v) in values.into_iter().enumerate() {
                data[r * N_FEATURES + c] = v;
            }
        }
        let x = Array2::from_shape_vec((n, N_FEATURES), data)?;

        let labels = float_column(df, TARGET_COLUMN)?;
        if let Some(bad) = labels.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(MaintenanceError::SchemaError(format!(
                "{} must be 0 or 1, found {}",
                TARGET_COLUMN, bad
            )));
        }

        Ok(Self {
            x,
            y: Array1::from_vec(labels),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    /// Labels as integers, for stratification
    pub fn labels(&self) -> Vec<i64> {
        self.y.iter().map(|&v| v as i64).collect()
    }

    /// Fraction of positive labels
    pub fn positive_rate(&self) -> f64 {
        self.y.sum() / self.y.len() as f64
    }
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| MaintenanceError::SchemaError(format!("column {} is missing", name)))?;
    let casted = column.cast(&DataType::Float64)?;
    casted
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.filter(|x| !x.is_nan())
                .ok_or_else(|| MaintenanceError::DataError(format!("missing value in {} at row {}", name, row)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_frame() {
        let df = df!(
            "Engine_Condition" => &[1i64, 0],
            "Coolant_Temperature" => &[80.0, 81.0],
            "Engine_RPM" => &[700.0, 900.0],
            "Lub_Oil_Pressure" => &[3.0, 3.1],
            "Fuel_Pressure" => &[10.0, 11.0],
            "Coolant_Pressure" => &[2.0, 2.1],
            "Lub_Oil_Temperature" => &[77.0, 78.0]
        )
        .unwrap();

        let data = TrainingData::from_frame(&df).unwrap();
        assert_eq!(data.x.shape(), &[2, 6]);
        assert_eq!(data.x[[0, 0]], 700.0);
        assert_eq!(data.x[[1, 5]], 81.0);
        assert_eq!(data.labels(), vec![1, 0]);
        assert!((data.positive_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_column() {
        let df = df!("Engine_RPM" => &[1.0]).unwrap();
        assert!(matches!(
            TrainingData::from_frame(&df),
            Err(MaintenanceError::SchemaError(_))
        ));
    }
}
