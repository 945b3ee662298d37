//! Storage backend for experiment tracking
//!
//! Layout under the tracking root:
//! `<experiment>/meta.json` and `<experiment>/runs/<run_id>.json`.

use super::tracker::{ExperimentMeta, RunRecord};
use crate::error::{MaintenanceError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence for experiments and runs
pub trait StorageBackend: Send + Sync {
    /// Create or refresh the experiment record
    fn save_experiment(&self, meta: &ExperimentMeta) -> Result<()>;

    /// Load the experiment record, if any
    fn load_experiment(&self, name: &str) -> Result<Option<ExperimentMeta>>;

    /// Write a run record, replacing any previous version of the same run
    fn save_run(&self, run: &RunRecord) -> Result<()>;

    /// All runs of an experiment, oldest first
    fn load_runs(&self, experiment: &str) -> Result<Vec<RunRecord>>;
}

/// Local file system storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn experiment_dir(&self, experiment: &str) -> PathBuf {
        self.base_dir.join(experiment)
    }

    fn runs_dir(&self, experiment: &str) -> PathBuf {
        self.experiment_dir(experiment).join("runs")
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl StorageBackend for LocalStorage {
    fn save_experiment(&self, meta: &ExperimentMeta) -> Result<()> {
        Self::write_json(&self.experiment_dir(&meta.name).join("meta.json"), meta)
    }

    fn load_experiment(&self, name: &str) -> Result<Option<ExperimentMeta>> {
        let path = self.experiment_dir(name).join("meta.json");
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&fs::read(path)?)?))
    }

    fn save_run(&self, run: &RunRecord) -> Result<()> {
        let path = self.runs_dir(&run.experiment).join(format!("{}.json", run.run_id));
        Self::write_json(&path, run)
    }

    fn load_runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        let dir = self.runs_dir(experiment);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let run: RunRecord = serde_json::from_slice(&fs::read(&path)?).map_err(|e| {
                MaintenanceError::SerializationError(format!("{}: {}", path.display(), e))
            })?;
            runs.push(run);
        }
        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }
}
