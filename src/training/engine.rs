//! Training engine: search, refit, evaluate, persist, track

use super::artifact::ModelArtifact;
use super::dataset::TrainingData;
use super::metrics::ClassificationMetrics;
use super::pipeline::MaintenancePipeline;
use super::random_forest::ForestParams;
use crate::artifacts::{Artifact, ArtifactResolver, PublishAck};
use crate::config::Settings;
use crate::error::Result;
use crate::optimizer::{HyperParams, RandomizedSearch, SearchResult, SearchSpace, TuningConfig};
use crate::tracking::{ExperimentTracker, LocalStorage, RunStatus};
use crate::utils::{DataLoader, Timer};
use polars::prelude::DataFrame;
use std::path::PathBuf;
use tracing::{info, warn};

/// Parent run name in the experiment tracker
pub const SEARCH_RUN_NAME: &str = "RandomForest_random_search";

/// Everything a training run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: MaintenancePipeline,
    /// Held-out test metrics of the refitted winner
    pub metrics: ClassificationMetrics,
    pub best_params: HyperParams,
    pub search: SearchResult,
    pub artifact: PublishAck,
    /// Parent tracker run, when tracking succeeded
    pub run_id: Option<String>,
}

/// Main training engine
#[derive(Debug)]
pub struct TrainEngine {
    config: TuningConfig,
    resolver: ArtifactResolver,
    tracker: Option<ExperimentTracker>,
    model_path: PathBuf,
}

impl TrainEngine {
    /// Engine wired from settings. An unusable tracking URI is a
    /// configuration error; a tracking sink that cannot be opened only
    /// disables tracking.
    pub fn new(settings: &Settings, resolver: ArtifactResolver) -> Result<Self> {
        let tracking_root = settings.tracking_dir()?;
        let tracker = match ExperimentTracker::open(Box::new(LocalStorage::new(&tracking_root)), &settings.experiment_name) {
            Ok(tracker) => Some(tracker),
            Err(e) => {
                warn!(root = %tracking_root.display(), error = %e, "Experiment tracking disabled");
                None
            }
        };

        Ok(Self {
            config: TuningConfig::from_settings(settings),
            model_path: resolver.local_path(Artifact::TrainedModel),
            resolver,
            tracker,
        })
    }

    /// Override the tuning configuration
    pub fn with_config(mut self, config: TuningConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace (or remove) the experiment tracker
    pub fn with_tracker(mut self, tracker: Option<ExperimentTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    pub fn tracker(&self) -> Option<&ExperimentTracker> {
        self.tracker.as_ref()
    }

    /// Search, refit the winner on the full train partition, evaluate on
    /// test, persist the pipeline and record the runs
    pub fn train(&self, train: &DataFrame, test: &DataFrame, space: &SearchSpace) -> Result<TrainingOutcome> {
        let timer = Timer::start();
        let train_data = TrainingData::from_frame(train)?;
        let test_data = TrainingData::from_frame(test)?;

        info!(
            train_rows = train_data.n_samples(),
            test_rows = test_data.n_samples(),
            positive_rate = train_data.positive_rate(),
            "Training maintenance classifier"
        );

        let search = RandomizedSearch::new(space.clone(), self.config.clone()).fit(&train_data)?;

        let params = ForestParams::from_hyperparams(&search.best_params)?;
        let pipeline = MaintenancePipeline::fit(&train_data.x, &train_data.y, &params, self.config.random_state)?;
        let metrics = ClassificationMetrics::compute(&test_data.y, &pipeline.predict(&test_data.x)?)?;

        info!(
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            "Test metrics for best configuration"
        );

        ModelArtifact::new(&pipeline, Some(metrics))?.write_to(&self.model_path)?;
        let artifact = self.resolver.publish(&self.model_path, Artifact::TrainedModel)?;
        if !artifact.remote_stored() {
            warn!(remote = ?artifact.remote, path = %artifact.local_path.display(), "Model kept locally only");
        }

        let run_id = self.track(&search, &metrics, &artifact);

        info!(
            path = %artifact.local_path.display(),
            elapsed_secs = timer.elapsed_secs(),
            "Training complete"
        );

        Ok(TrainingOutcome {
            pipeline,
            metrics,
            best_params: search.best_params.clone(),
            search,
            artifact,
            run_id,
        })
    }

    /// Write one nested run per trial and a parent run for the winner.
    /// Failures are logged, never returned.
    fn track(&self, search: &SearchResult, metrics: &ClassificationMetrics, artifact: &PublishAck) -> Option<String> {
        let tracker = self.tracker.as_ref()?;
        let mut parent = tracker.start_run(SEARCH_RUN_NAME);

        let result = (|| -> Result<()> {
            for trial in &search.trials {
                let mut child = tracker.start_nested_run(&parent, format!("trial_{}", trial.index));
                for (name, value) in &trial.params {
                    child.log_param(name.clone(), value);
                }
                child
                    .log_metric("mean_cv_f1", trial.mean_score)
                    .log_metric("std_cv_f1", trial.std_score);
                tracker.end_run(&mut child, RunStatus::Finished)?;
            }

            for (name, value) in &search.best_params {
                parent.log_param(name.clone(), value);
            }
            parent
                .log_param("n_iter", self.config.n_iter)
                .log_param("cv_folds", self.config.cv_folds)
                .log_param("random_state", self.config.random_state);
            for (name, value) in metrics.as_pairs() {
                parent.log_metric(name, value);
            }
            parent.log_metric("best_mean_cv_f1", search.best_score);
            parent.set_tag("model_path", artifact.local_path.display().to_string());
            tracker.end_run(&mut parent, RunStatus::Finished)
        })();

        match result {
            Ok(()) => Some(parent.run_id),
            Err(e) => {
                warn!(error = %e, "Failed to record training runs");
                None
            }
        }
    }
}

/// Run the training stage with the default search space
pub fn run_training(settings: &Settings, resolver: &ArtifactResolver) -> Result<TrainingOutcome> {
    run_training_with(settings, resolver, &SearchSpace::random_forest_default())
}

/// Run the training stage: resolve both splits, search, persist
pub fn run_training_with(settings: &Settings, resolver: &ArtifactResolver, space: &SearchSpace) -> Result<TrainingOutcome> {
    let loader = DataLoader::new();
    let train_path = resolver.resolve(Artifact::TrainSplit)?;
    let test_path = resolver.resolve(Artifact::TestSplit)?;
    let train = loader.load_csv(&train_path)?;
    let test = loader.load_csv(&test_path)?;

    TrainEngine::new(settings, resolver.clone())?.train(&train, &test, space)
}
