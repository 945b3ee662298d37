//! Raw table cleaning and partitioning
//!
//! `prepare` is pure: rename → deduplicate → impute → coerce label → split.
//! All I/O lives in the stage runner.

use super::schema::{canonical_name, FEATURE_COLUMNS, N_FEATURES, TARGET_COLUMN};
use super::split::{SplitConfig, StratifiedSplitter};
use crate::error::{MaintenanceError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

const LABEL_IDX: usize = N_FEATURES;

/// What `prepare` did to the data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreparationReport {
    pub raw_rows: usize,
    pub dropped_columns: Vec<String>,
    pub duplicates_removed: usize,
    /// Imputed cells per feature column
    pub imputed: BTreeMap<String, usize>,
    pub clean_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Fraction of label 1 in the cleaned data
    pub positive_rate: f64,
    pub elapsed_secs: f64,
}

/// Output of a preparation run
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub train: DataFrame,
    pub test: DataFrame,
    pub report: PreparationReport,
}

/// Cleans a raw engine table and splits it into train/test partitions
#[derive(Debug, Clone, Default)]
pub struct DataPreparer {
    split: SplitConfig,
}

impl DataPreparer {
    pub fn new(split: SplitConfig) -> Self {
        Self { split }
    }

    /// Clean and split, returning `(train, test)`
    pub fn prepare(&self, raw: &DataFrame) -> Result<(DataFrame, DataFrame)> {
        let prepared = self.prepare_with_report(raw)?;
        Ok((prepared.train, prepared.test))
    }

    /// Clean and split, keeping the preparation report
    pub fn prepare_with_report(&self, raw: &DataFrame) -> Result<PreparedData> {
        let start = Instant::now();
        self.split.validate()?;

        let mut report = PreparationReport {
            raw_rows: raw.height(),
            ..Default::default()
        };

        let (selected, dropped) = select_canonical(raw)?;
        report.dropped_columns = dropped;
        if !report.dropped_columns.is_empty() {
            debug!(columns = ?report.dropped_columns, "Dropped unknown columns");
        }

        // Missing cells compare equal, the first occurrence is kept
        let deduped = selected.unique_stable(None, UniqueKeepStrategy::First, None)?;
        report.duplicates_removed = report.raw_rows - deduped.height();
        if deduped.height() == 0 {
            return Err(MaintenanceError::EmptyDataset(format!(
                "no rows left after cleaning ({} raw rows)",
                report.raw_rows
            )));
        }

        let (mut cleaned, imputed) = impute_median(deduped)?;
        report.imputed = imputed;

        let labels = coerce_labels(&cleaned)?;
        cleaned.with_column(Series::new(TARGET_COLUMN.into(), labels.clone()))?;
        report.clean_rows = labels.len();
        report.positive_rate = labels.iter().filter(|&&l| l == 1).count() as f64 / labels.len() as f64;

        let split = StratifiedSplitter::new(self.split.clone()).split(&labels)?;
        report.train_rows = split.train.len();
        report.test_rows = split.test.len();

        let train = take_rows(&cleaned, &split.train)?;
        let test = take_rows(&cleaned, &split.test)?;

        report.elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            raw_rows = report.raw_rows,
            duplicates = report.duplicates_removed,
            clean_rows = report.clean_rows,
            train_rows = report.train_rows,
            test_rows = report.test_rows,
            positive_rate = report.positive_rate,
            "Prepared engine dataset"
        );

        Ok(PreparedData { train, test, report })
    }
}

/// Rename headers to canonical names and keep only canonical columns, in
/// canonical order, as Float64 with NaN cells turned into nulls.
/// Returns the frame plus the names of dropped columns.
fn select_canonical(raw: &DataFrame) -> Result<(DataFrame, Vec<String>)> {
    let mut slots: [Option<Column>; N_FEATURES + 1] = Default::default();
    let mut dropped = Vec::new();

    for column in raw.get_columns() {
        let header = column.name().as_str();
        let Some(canonical) = canonical_name(header) else {
            dropped.push(header.to_string());
            continue;
        };
        let idx = if canonical == TARGET_COLUMN {
            LABEL_IDX
        } else {
            FEATURE_COLUMNS
                .iter()
                .position(|c| *c == canonical)
                .unwrap_or(LABEL_IDX)
        };
        if slots[idx].is_some() {
            // Two headers mapping to one canonical name: the first one wins
            dropped.push(header.to_string());
            continue;
        }

        let values: Float64Chunked = column
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        slots[idx] = Some(values.with_name(canonical.into()).into_series().into());
    }

    let missing: Vec<&str> = FEATURE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(TARGET_COLUMN))
        .enumerate()
        .filter(|(i, _)| slots[*i].is_none())
        .map(|(_, name)| name)
        .collect();
    if !missing.is_empty() {
        return Err(MaintenanceError::SchemaError(format!(
            "required columns missing after renaming: {}",
            missing.join(", ")
        )));
    }

    let df = DataFrame::new(slots.into_iter().flatten().collect())?;
    Ok((df, dropped))
}

/// Fill missing feature cells with the column median of the observed values
fn impute_median(mut df: DataFrame) -> Result<(DataFrame, BTreeMap<String, usize>)> {
    let mut imputed = BTreeMap::new();

    for name in FEATURE_COLUMNS.iter() {
        let ca = df.column(name)?.f64()?.clone();
        let n_missing = ca.null_count();
        if n_missing == 0 {
            continue;
        }
        let fill = ca.median().ok_or_else(|| {
            MaintenanceError::SchemaError(format!("column {} has no observed values to impute from", name))
        })?;

        df.with_column(ca.fill_null_with_values(fill)?.into_series())?;
        debug!(column = name, missing = n_missing, median = fill, "Imputed missing values");
        imputed.insert(name.to_string(), n_missing);
    }

    Ok((df, imputed))
}

/// Integer labels in {0, 1}, truncating fractional values
fn coerce_labels(df: &DataFrame) -> Result<Vec<i64>> {
    df.column(TARGET_COLUMN)?
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let raw_label = value.ok_or_else(|| {
                MaintenanceError::SchemaError(format!("{} is missing in cleaned row {}", TARGET_COLUMN, i))
            })?;
            let label = raw_label.trunc() as i64;
            if label != 0 && label != 1 {
                return Err(MaintenanceError::SchemaError(format!(
                    "{} must be 0 or 1, found {} in cleaned row {}",
                    TARGET_COLUMN, raw_label, i
                )));
            }
            Ok(label)
        })
        .collect()
}

/// Select the given rows of the cleaned frame
fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec("idx".into(), indices.iter().map(|&i| i as IdxSize).collect());
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df!(
            "Engine rpm" => &[700.0, 800.0, 800.0, 900.0, 1000.0, 1100.0, 1200.0, 1300.0, 1400.0, 1500.0],
            "Lub oil pressure" => &[3.0, 3.1, 3.1, 2.9, 3.3, 2.5, 2.4, 2.2, 2.0, 1.9],
            "Fuel pressure" => &[Some(10.0), Some(11.0), Some(11.0), None, Some(9.0), Some(8.0), Some(7.5), None, Some(6.0), Some(5.0)],
            "Coolant pressure" => &[2.0, 2.1, 2.1, 2.2, 2.3, 2.4, 2.5, 2.6, 2.7, 2.8],
            "lub oil temp" => &[77.0, 78.0, 78.0, 79.0, 80.0, 81.0, 82.0, 83.0, 84.0, 85.0],
            "Coolant temp" => &[70.0, 72.0, 72.0, 74.0, 76.0, 78.0, 80.0, 82.0, 84.0, 86.0],
            "Engine Condition" => &[0i64, 0, 0, 0, 0, 1, 1, 1, 1, 1],
            "Notes" => &["a", "b", "b", "c", "d", "e", "f", "g", "h", "i"]
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_columns_and_order() {
        let prepared = DataPreparer::default().prepare_with_report(&raw_frame()).unwrap();
        let names: Vec<String> = prepared
            .train
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut expected: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
        expected.push(TARGET_COLUMN.to_string());
        assert_eq!(names, expected);
        assert_eq!(prepared.report.dropped_columns, vec!["Notes".to_string()]);
    }

    #[test]
    fn test_duplicates_and_imputation() {
        let prepared = DataPreparer::default().prepare_with_report(&raw_frame()).unwrap();
        assert_eq!(prepared.report.duplicates_removed, 1);
        assert_eq!(prepared.report.clean_rows, 9);
        assert_eq!(prepared.report.imputed.get("Fuel_Pressure"), Some(&2));
        assert_eq!(prepared.train.height() + prepared.test.height(), 9);

        for df in [&prepared.train, &prepared.test] {
            for col in df.get_columns() {
                assert_eq!(col.null_count(), 0);
            }
        }
    }

    #[test]
    fn test_missing_label_column() {
        let raw = raw_frame().drop("Engine Condition").unwrap();
        let err = DataPreparer::default().prepare(&raw).unwrap_err();
        match err {
            MaintenanceError::SchemaError(msg) => assert!(msg.contains(TARGET_COLUMN)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_dataset() {
        let raw = raw_frame().head(Some(0));
        let err = DataPreparer::default().prepare(&raw).unwrap_err();
        assert!(matches!(err, MaintenanceError::EmptyDataset(_)));
    }

    #[test]
    fn test_non_binary_label() {
        let mut raw = raw_frame();
        raw.with_column(Series::new("Engine Condition".into(), &[0i64, 0, 0, 0, 0, 1, 1, 1, 1, 2]))
            .unwrap();
        let err = DataPreparer::default().prepare(&raw).unwrap_err();
        assert!(matches!(err, MaintenanceError::SchemaError(_)));
    }

    fn fuel_by_rpm(df: &DataFrame) -> Vec<(f64, f64)> {
        let rpm = df.column("Engine_RPM").unwrap().f64().unwrap();
        let fuel = df.column("Fuel_Pressure").unwrap().f64().unwrap();
        rpm.into_no_null_iter().zip(fuel.into_no_null_iter()).collect()
    }

    #[test]
    fn test_imputes_median_after_dedup() {
        let (train, test) = DataPreparer::default().prepare(&raw_frame()).unwrap();
        let pairs: Vec<(f64, f64)> = fuel_by_rpm(&train).into_iter().chain(fuel_by_rpm(&test)).collect();

        // Observed after dedup: 5, 6, 7.5, 8, 9, 10, 11
        for rpm in [900.0, 1300.0] {
            let fuel = pairs.iter().find(|(r, _)| *r == rpm).map(|(_, f)| *f);
            assert_eq!(fuel, Some(8.0));
        }
    }

    #[test]
    fn test_nan_cells_are_imputed() {
        let mut raw = raw_frame();
        raw.with_column(Series::new(
            "Coolant temp".into(),
            &[70.0, 72.0, 72.0, f64::NAN, 76.0, 78.0, 80.0, 82.0, 84.0, 86.0],
        ))
        .unwrap();
        let prepared = DataPreparer::default().prepare_with_report(&raw).unwrap();
        assert_eq!(prepared.report.imputed.get("Coolant_Temperature"), Some(&1));
        for df in [&prepared.train, &prepared.test] {
            let col = df.column("Coolant_Temperature").unwrap().f64().unwrap();
            assert!(col.into_no_null_iter().all(f64::is_finite));
        }
    }

    #[test]
    fn test_label_column_is_integer() {
        let (train, _) = DataPreparer::default().prepare(&raw_frame()).unwrap();
        assert_eq!(train.column(TARGET_COLUMN).unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_canonical_headers_pass_through() {
        let raw = df!(
            "Engine_RPM" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "Lub_Oil_Pressure" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "Fuel_Pressure" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "Coolant_Pressure" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "Lub_Oil_Temperature" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "Coolant_Temperature" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "Engine_Condition" => &[0i64, 0, 1, 1, 1]
        )
        .unwrap();
        let (train, test) = DataPreparer::default().prepare(&raw).unwrap();
        assert_eq!(train.height() + test.height(), 5);
        assert_eq!(test.height(), 1);
    }
}
