//! Experiment tracking
//!
//! File-backed, append-only record of training runs.

pub mod storage;
pub mod tracker;

pub use storage::{LocalStorage, StorageBackend};
pub use tracker::{ExperimentMeta, ExperimentTracker, RunRecord, RunStatus};
