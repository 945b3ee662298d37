//! Integration tests for data preparation: renaming, cleaning and splitting

use engine_maintenance::artifacts::ArtifactResolver;
use engine_maintenance::config::Settings;
use engine_maintenance::preprocessing::{
    prepare, run_preparation, DataPreparer, SplitConfig, FEATURE_COLUMNS, TARGET_COLUMN,
};
use engine_maintenance::utils::{DataLoader, DataSaver};
use engine_maintenance::MaintenanceError;
use polars::prelude::*;
use std::collections::HashSet;

/// 80 unique readings (1 in 4 faulty), the first 20 repeated, and 5 missing
/// fuel pressures, under the original CSV headers.
fn raw_engine_frame() -> DataFrame {
    let mut rpm = Vec::new();
    let mut lub_pressure = Vec::new();
    let mut fuel = Vec::new();
    let mut coolant_pressure = Vec::new();
    let mut lub_temp = Vec::new();
    let mut coolant_temp = Vec::new();
    let mut condition = Vec::new();

    for i in (0..80).chain(0..20) {
        let faulty = i % 4 == 0;
        rpm.push(600.0 + i as f64 * 10.0);
        lub_pressure.push((if faulty { 1.5 } else { 3.5 }) + (i % 5) as f64 * 0.1);
        fuel.push(if (30..35).contains(&i) { None } else { Some(5.0 + (i % 7) as f64) });
        coolant_pressure.push(2.0 + (i % 3) as f64 * 0.5);
        lub_temp.push((if faulty { 90.0 } else { 77.0 }) + (i % 4) as f64);
        coolant_temp.push(70.0 + (i % 9) as f64);
        condition.push(faulty as i64);
    }

    df!(
        "Engine rpm" => rpm,
        "Lub oil pressure" => lub_pressure,
        "Fuel pressure" => fuel,
        "Coolant pressure" => coolant_pressure,
        "lub oil temp" => lub_temp,
        "Coolant temp" => coolant_temp,
        "Engine Condition" => condition
    )
    .unwrap()
}

fn rpm_values(df: &DataFrame) -> Vec<f64> {
    df.column("Engine_RPM")
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn positive_fraction(df: &DataFrame) -> f64 {
    let labels = df.column(TARGET_COLUMN).unwrap().i64().unwrap();
    let positives = labels.into_no_null_iter().filter(|&l| l == 1).count();
    positives as f64 / df.height() as f64
}

#[test]
fn test_prepare_raw_engine_table() {
    let (train, test) = prepare(&raw_engine_frame()).unwrap();

    assert_eq!(train.height() + test.height(), 80);
    assert_eq!(test.height(), 16);

    let expected: Vec<&str> = FEATURE_COLUMNS.iter().copied().chain([TARGET_COLUMN]).collect();
    for df in [&train, &test] {
        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, expected);
        assert!(df.get_columns().iter().all(|c| c.null_count() == 0));
    }

    let train_rpm: HashSet<u64> = rpm_values(&train).into_iter().map(f64::to_bits).collect();
    let test_rpm: HashSet<u64> = rpm_values(&test).into_iter().map(f64::to_bits).collect();
    assert!(train_rpm.is_disjoint(&test_rpm));
    assert_eq!(train_rpm.len() + test_rpm.len(), 80);
}

#[test]
fn test_prepare_keeps_class_proportions() {
    let (train, test) = prepare(&raw_engine_frame()).unwrap();
    assert!((positive_fraction(&train) - 0.25).abs() < 0.02);
    assert!((positive_fraction(&test) - 0.25).abs() < 0.02);
}

#[test]
fn test_prepare_is_deterministic() {
    let raw = raw_engine_frame();
    let (train_a, test_a) = prepare(&raw).unwrap();
    let (train_b, test_b) = prepare(&raw).unwrap();
    assert!(train_a.equals(&train_b));
    assert!(test_a.equals(&test_b));

    let (train_c, _) = DataPreparer::new(SplitConfig::new(0.2, 7)).prepare(&raw).unwrap();
    assert!(!train_a.equals(&train_c));
}

#[test]
fn test_prepare_report() {
    let prepared = DataPreparer::default().prepare_with_report(&raw_engine_frame()).unwrap();
    let report = prepared.report;
    assert_eq!(report.raw_rows, 100);
    assert_eq!(report.duplicates_removed, 20);
    assert_eq!(report.clean_rows, 80);
    assert_eq!(report.imputed.get("Fuel_Pressure"), Some(&5));
    assert!(report.dropped_columns.is_empty());
}

#[test]
fn test_prepare_rejects_bad_test_size() {
    let result = DataPreparer::new(SplitConfig::new(1.5, 42)).prepare(&raw_engine_frame());
    assert!(matches!(result, Err(MaintenanceError::ConfigError(_))));
}

#[test]
fn test_prepare_missing_feature_column() {
    let raw = raw_engine_frame().drop("Coolant temp").unwrap();
    assert!(matches!(prepare(&raw), Err(MaintenanceError::SchemaError(_))));
}

#[test]
fn test_preparation_stage_writes_splits() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::default()
        .with_data_dir(dir.path().join("data"))
        .with_models_dir(dir.path().join("models"));
    DataSaver::save_csv(&mut raw_engine_frame(), &settings.raw_data_file()).unwrap();

    let resolver = ArtifactResolver::local_only(&settings);
    let outcome = run_preparation(&settings, &resolver).unwrap();

    assert_eq!(outcome.report.duplicates_removed, 20);
    assert_eq!(outcome.report.imputed.get("Fuel_Pressure"), Some(&5));

    let loader = DataLoader::new();
    let train = loader.load_csv(&settings.train_file()).unwrap();
    let test = loader.load_csv(&settings.test_file()).unwrap();
    assert_eq!(train.height(), outcome.report.train_rows);
    assert_eq!(test.height(), outcome.report.test_rows);
    assert_eq!(train.width(), FEATURE_COLUMNS.len() + 1);
}
