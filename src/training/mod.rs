//! Model training module
//!
//! Provides the maintenance classifier and the stage that tunes it:
//! - Decision trees and Random Forests (Gini, probability leaves)
//! - Standard scaler + forest pipeline and its persisted envelope
//! - Stratified cross-validation and binary classification metrics
//! - The training engine that searches, refits, evaluates and publishes

pub mod artifact;
pub mod cross_validation;
pub mod decision_tree;
mod dataset;
mod engine;
pub mod metrics;
mod pipeline;
pub mod random_forest;

pub use artifact::{deserialize_pipeline, serialize_pipeline, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use cross_validation::{CVSplit, CVStrategy, CrossValidator};
pub use dataset::TrainingData;
pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::{run_training, run_training_with, TrainEngine, TrainingOutcome, SEARCH_RUN_NAME};
pub use metrics::{ClassificationMetrics, ConfusionCounts};
pub use pipeline::{MaintenancePipeline, DECISION_THRESHOLD};
pub use random_forest::{ForestParams, MaxFeatures, RandomForest};
