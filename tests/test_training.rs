//! Integration tests for training: pipeline persistence, search and tracking

use engine_maintenance::artifacts::ArtifactResolver;
use engine_maintenance::config::Settings;
use engine_maintenance::optimizer::{Parameter, ParameterValue, RandomizedSearch, SearchSpace, TuningConfig};
use engine_maintenance::preprocessing::{FEATURE_COLUMNS, TARGET_COLUMN};
use engine_maintenance::training::{
    deserialize_pipeline, serialize_pipeline, ForestParams, MaintenancePipeline, ModelArtifact, TrainEngine,
    TrainingData, SEARCH_RUN_NAME,
};
use engine_maintenance::MaintenanceError;
use ndarray::array;
use polars::prelude::*;

/// Prepared-style partition where faulty engines run hot with low oil pressure
fn separable_frame(n: usize, offset: usize) -> DataFrame {
    let faulty: Vec<bool> = (0..n).map(|i| (i + offset) % 3 == 0).collect();
    let jitter = |i: usize, k: usize| ((i * 7 + k) % 11) as f64 * 0.01;

    let rpm: Vec<f64> = (0..n).map(|i| (if faulty[i] { 1800.0 } else { 750.0 }) + jitter(i, 0) * 100.0).collect();
    let lub_pressure: Vec<f64> = (0..n).map(|i| (if faulty[i] { 1.2 } else { 3.4 }) + jitter(i, 1)).collect();
    let fuel: Vec<f64> = (0..n).map(|i| (if faulty[i] { 4.0 } else { 11.0 }) + jitter(i, 2)).collect();
    let coolant_pressure: Vec<f64> = (0..n).map(|i| (if faulty[i] { 4.5 } else { 2.1 }) + jitter(i, 3)).collect();
    let lub_temp: Vec<f64> = (0..n).map(|i| (if faulty[i] { 96.0 } else { 77.0 }) + jitter(i, 4)).collect();
    let coolant_temp: Vec<f64> = (0..n).map(|i| (if faulty[i] { 97.0 } else { 72.0 }) + jitter(i, 5)).collect();
    let labels: Vec<i64> = faulty.iter().map(|&f| f as i64).collect();

    df!(
        FEATURE_COLUMNS[0] => rpm,
        FEATURE_COLUMNS[1] => lub_pressure,
        FEATURE_COLUMNS[2] => fuel,
        FEATURE_COLUMNS[3] => coolant_pressure,
        FEATURE_COLUMNS[4] => lub_temp,
        FEATURE_COLUMNS[5] => coolant_temp,
        TARGET_COLUMN => labels
    )
    .unwrap()
}

fn small_space() -> SearchSpace {
    SearchSpace::new()
        .add(Parameter::ints("n_estimators", &[5, 10, 20]))
        .add(Parameter::new(
            "max_depth",
            vec![ParameterValue::None, ParameterValue::Int(3)],
        ))
}

#[test]
fn test_pipeline_persistence_preserves_probabilities() {
    let data = TrainingData::from_frame(&separable_frame(60, 0)).unwrap();
    let params = ForestParams {
        n_estimators: 15,
        ..Default::default()
    };
    let pipeline = MaintenancePipeline::fit(&data.x, &data.y, &params, 42).unwrap();

    let bytes = serialize_pipeline(&pipeline).unwrap();
    let restored = deserialize_pipeline(&bytes).unwrap();

    let readings = array![
        [800.0, 3.0, 10.0, 2.0, 80.0, 80.0],
        [1850.0, 1.1, 4.2, 4.4, 95.0, 96.0],
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    ];
    assert_eq!(restored.predict_proba(&readings).unwrap(), pipeline.predict_proba(&readings).unwrap());
    assert_eq!(restored.feature_names(), pipeline.feature_names());
}

#[test]
fn test_separable_data_is_learned() {
    let train = TrainingData::from_frame(&separable_frame(60, 0)).unwrap();
    let test = TrainingData::from_frame(&separable_frame(21, 1)).unwrap();
    let pipeline = MaintenancePipeline::fit(&train.x, &train.y, &ForestParams::default(), 42).unwrap();
    assert_eq!(pipeline.predict(&test.x).unwrap(), test.y);
}

#[test]
fn test_search_is_deterministic() {
    let data = TrainingData::from_frame(&separable_frame(45, 0)).unwrap();
    let config = TuningConfig::new().with_n_iter(4).with_cv_folds(3).with_random_state(11);

    let first = RandomizedSearch::new(small_space(), config.clone()).fit(&data).unwrap();
    let second = RandomizedSearch::new(small_space(), config).fit(&data).unwrap();

    assert_eq!(first.trials.len(), 4);
    assert_eq!(first.best_index, second.best_index);
    assert_eq!(first.best_params, second.best_params);
    assert_eq!(first.trials, second.trials);
}

#[test]
fn test_engine_records_parent_and_nested_runs() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::default()
        .with_data_dir(dir.path().join("data"))
        .with_models_dir(dir.path().join("models"))
        .with_tracking(format!("file://{}", dir.path().join("mlruns").display()), "engines")
        .with_search(3, 3);

    let engine = TrainEngine::new(&settings, ArtifactResolver::local_only(&settings)).unwrap();
    let outcome = engine
        .train(&separable_frame(45, 0), &separable_frame(15, 2), &small_space())
        .unwrap();

    let tracker = engine.tracker().unwrap();
    let runs = tracker.runs().unwrap();
    assert_eq!(runs.len(), 4);

    let parents: Vec<_> = runs.iter().filter(|r| !r.is_nested()).collect();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].run_name, SEARCH_RUN_NAME);
    assert_eq!(Some(parents[0].run_id.clone()), outcome.run_id);
    for name in ["accuracy", "precision", "recall", "f1"] {
        assert!(parents[0].metrics.contains_key(name));
    }
    assert_eq!(tracker.child_runs(&parents[0].run_id).unwrap().len(), 3);

    let artifact = ModelArtifact::read_from(&settings.model_file()).unwrap();
    assert_eq!(artifact.features, FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    assert!(artifact.metrics.is_some());
}

#[test]
fn test_engine_rejects_bad_label() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::default()
        .with_models_dir(dir.path().join("models"))
        .with_tracking(format!("file://{}", dir.path().join("mlruns").display()), "engines");
    let engine = TrainEngine::new(&settings, ArtifactResolver::local_only(&settings))
        .unwrap()
        .with_tracker(None);

    let mut train = separable_frame(30, 0);
    train
        .with_column(Series::new(TARGET_COLUMN.into(), vec![2i64; 30]))
        .unwrap();
    let result = engine.train(&train, &separable_frame(9, 0), &small_space());
    assert!(matches!(result, Err(MaintenanceError::SchemaError(_))));
}
