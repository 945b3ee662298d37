//! Experiment tracker
//!
//! Records training runs with parameters and metrics. A search produces one
//! parent run for the winner and one nested run per evaluated configuration.

use super::storage::{LocalStorage, StorageBackend};
use crate::config::Settings;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Experiment header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMeta {
    pub experiment_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl ExperimentMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            experiment_id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// A run within an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub experiment: String,
    pub run_name: String,
    /// Set on nested runs
    pub parent_run_id: Option<String>,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub tags: BTreeMap<String, String>,
}

impl RunRecord {
    pub fn new(experiment: impl Into<String>, run_name: impl Into<String>, parent_run_id: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().simple().to_string(),
            experiment: experiment.into(),
            run_name: run_name.into(),
            parent_run_id,
            status: RunStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn log_metric(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.metrics.insert(key.into(), value);
        self
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn is_nested(&self) -> bool {
        self.parent_run_id.is_some()
    }
}

/// Experiment tracker bound to one experiment
pub struct ExperimentTracker {
    storage: Box<dyn StorageBackend>,
    experiment: ExperimentMeta,
}

impl std::fmt::Debug for ExperimentTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentTracker")
            .field("experiment", &self.experiment.name)
            .finish()
    }
}

impl ExperimentTracker {
    /// Tracker over the sink named by the tracking URI in settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let root = settings.tracking_dir()?;
        Self::open(Box::new(LocalStorage::new(root)), &settings.experiment_name)
    }

    /// Open (or create) an experiment on a storage backend
    pub fn open(storage: Box<dyn StorageBackend>, experiment: &str) -> Result<Self> {
        let experiment = match storage.load_experiment(experiment)? {
            Some(meta) => meta,
            None => {
                let meta = ExperimentMeta::new(experiment);
                storage.save_experiment(&meta)?;
                debug!(experiment = %meta.name, "Created experiment");
                meta
            }
        };
        Ok(Self { storage, experiment })
    }

    pub fn experiment(&self) -> &ExperimentMeta {
        &self.experiment
    }

    /// Start a top-level run
    pub fn start_run(&self, run_name: impl Into<String>) -> RunRecord {
        RunRecord::new(self.experiment.name.clone(), run_name, None)
    }

    /// Start a run nested under `parent`
    pub fn start_nested_run(&self, parent: &RunRecord, run_name: impl Into<String>) -> RunRecord {
        RunRecord::new(self.experiment.name.clone(), run_name, Some(parent.run_id.clone()))
    }

    /// Close a run with the given status and persist it
    pub fn end_run(&self, run: &mut RunRecord, status: RunStatus) -> Result<()> {
        run.status = status;
        run.end_time = Some(Utc::now());
        self.storage.save_run(run)
    }

    /// All recorded runs of this experiment
    pub fn runs(&self) -> Result<Vec<RunRecord>> {
        self.storage.load_runs(&self.experiment.name)
    }

    /// Nested runs of a parent run
    pub fn child_runs(&self, parent_run_id: &str) -> Result<Vec<RunRecord>> {
        Ok(self
            .runs()?
            .into_iter()
            .filter(|r| r.parent_run_id.as_deref() == Some(parent_run_id))
            .collect())
    }

    /// Best finished run by a metric (higher is better)
    pub fn best_run(&self, metric: &str) -> Result<Option<RunRecord>> {
        Ok(self
            .runs()?
            .into_iter()
            .filter(|r| r.status == RunStatus::Finished && r.metrics.contains_key(metric))
            .max_by(|a, b| {
                let va = a.metrics.get(metric).copied().unwrap_or(f64::MIN);
                let vb = b.metrics.get(metric).copied().unwrap_or(f64::MIN);
                va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
            }))
    }
}
