//! Engine Maintenance - predictive maintenance for engine fleets
//!
//! This crate turns raw engine sensor readings into a tuned classifier that
//! flags engines requiring maintenance:
//! - Artifact resolution against a remote store with local fallback
//! - Data preparation: renaming, deduplication, imputation, stratified split
//! - Randomized hyperparameter search over a scaled random forest
//! - Single-reading inference with a fixed 0.5 threshold
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`artifacts`] - Remote-first artifact resolver and publisher
//! - [`preprocessing`] - Cleaning, imputation and stratified splitting
//! - [`training`] - Random forest pipeline, CV, metrics, training engine
//! - [`optimizer`] - Search space and randomized search
//! - [`inference`] - Prediction service with per-source model cache
//!
//! ## Infrastructure
//! - [`config`] - Environment-driven settings
//! - [`tracking`] - File-backed experiment tracking
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod error;
pub mod config;

// Pipeline stages
pub mod artifacts;
pub mod preprocessing;
pub mod training;
pub mod optimizer;
pub mod inference;

// Infrastructure
pub mod tracking;
pub mod utils;

// Services
pub mod cli;

pub use config::Settings;
pub use error::{MaintenanceError, Result};
pub use inference::predict;
pub use preprocessing::{prepare, FEATURE_COLUMNS, FEATURE_SCHEMA, TARGET_COLUMN};

/// Re-export commonly used types
pub mod prelude {
    // Error handling and settings
    pub use crate::config::{HubSettings, Settings};
    pub use crate::error::{MaintenanceError, Result};

    // Artifacts
    pub use crate::artifacts::{Artifact, ArtifactResolver, ArtifactSource, PublishAck, RemoteOutcome, RemoteStore};

    // Preprocessing
    pub use crate::preprocessing::{
        prepare, run_preparation, DataPreparer, SplitConfig, StandardScaler, FEATURE_COLUMNS, FEATURE_SCHEMA,
        TARGET_COLUMN,
    };

    // Training
    pub use crate::training::{
        deserialize_pipeline, run_training, serialize_pipeline, ClassificationMetrics, ForestParams,
        MaintenancePipeline, RandomForest, TrainEngine, TrainingData,
    };

    // Optimization
    pub use crate::optimizer::{ParameterValue, RandomizedSearch, SearchSpace, TuningConfig};

    // Inference
    pub use crate::inference::{predict, InferenceConfig, InferenceEngine, Prediction};

    // Experiment tracking
    pub use crate::tracking::{ExperimentTracker, LocalStorage, RunRecord};
}
