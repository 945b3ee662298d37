//! Process-wide settings
//!
//! Everything the pipeline reads from the environment is collected once into an
//! immutable [`Settings`] value that is handed to each component at construction.
//! Missing credentials are not an error: the pipeline silently runs local-only.

use crate::error::{MaintenanceError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default remote endpoint for the artifact store
pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";
/// Default experiment name for the tracker
pub const DEFAULT_EXPERIMENT_NAME: &str = "engine_predictive_maintenance";

/// Remote artifact store settings
#[derive(Clone, Serialize, Deserialize)]
pub struct HubSettings {
    /// Base URL of the store
    pub endpoint: String,
    /// Bearer token; remote access is disabled without it
    pub token: Option<String>,
    /// Repository holding raw data and splits
    pub dataset_repo: Option<String>,
    /// Repository holding the trained pipeline
    pub model_repo: Option<String>,
    /// Request timeout
    pub timeout_secs: u64,
}

impl std::fmt::Debug for HubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSettings")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("dataset_repo", &self.dataset_repo)
            .field("model_repo", &self.model_repo)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_HUB_ENDPOINT.to_string(),
            token: None,
            dataset_repo: None,
            model_repo: None,
            timeout_secs: 60,
        }
    }
}

impl HubSettings {
    /// True when a non-empty token is configured
    pub fn has_credentials(&self) -> bool {
        self.token.as_deref().map_or(false, |t| !t.trim().is_empty())
    }

    /// Dataset repository, only when credentials are also present
    pub fn dataset_remote(&self) -> Option<&str> {
        self.dataset_repo.as_deref().filter(|_| self.has_credentials())
    }

    /// Model repository, only when credentials are also present
    pub fn model_remote(&self) -> Option<&str> {
        self.model_repo.as_deref().filter(|_| self.has_credentials())
    }
}

/// Immutable configuration for every pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Local data cache (raw dataset and processed splits)
    pub data_dir: PathBuf,
    /// Local model cache
    pub models_dir: PathBuf,
    /// Remote store
    pub hub: HubSettings,
    /// Experiment tracking sink
    pub tracking_uri: String,
    /// Experiment name inside the tracking sink
    pub experiment_name: String,
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// Seed shared by the split, the search and the forest
    pub random_state: u64,
    /// Number of sampled hyperparameter configurations
    pub search_iterations: usize,
    /// Cross-validation folds
    pub cv_folds: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            models_dir: PathBuf::from("./models"),
            hub: HubSettings::default(),
            tracking_uri: "file://./mlruns".to_string(),
            experiment_name: DEFAULT_EXPERIMENT_NAME.to_string(),
            test_size: 0.2,
            random_state: 42,
            search_iterations: 20,
            cv_folds: 5,
        }
    }
}

impl Settings {
    /// Build settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let settings = Self {
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            models_dir: get("MODELS_DIR").map(PathBuf::from).unwrap_or(defaults.models_dir),
            hub: HubSettings {
                endpoint: get("HF_ENDPOINT").unwrap_or(defaults.hub.endpoint),
                token: get("HF_TOKEN"),
                dataset_repo: get("HF_DATASET_REPO"),
                model_repo: get("HF_MODEL_REPO"),
                timeout_secs: parse_var("HF_TIMEOUT_SECS", get("HF_TIMEOUT_SECS"), defaults.hub.timeout_secs)?,
            },
            tracking_uri: get("TRACKING_URI").unwrap_or(defaults.tracking_uri),
            experiment_name: get("EXPERIMENT_NAME").unwrap_or(defaults.experiment_name),
            test_size: parse_var("TEST_SIZE", get("TEST_SIZE"), defaults.test_size)?,
            random_state: parse_var("RANDOM_STATE", get("RANDOM_STATE"), defaults.random_state)?,
            search_iterations: parse_var("SEARCH_ITERATIONS", get("SEARCH_ITERATIONS"), defaults.search_iterations)?,
            cv_folds: parse_var("CV_FOLDS", get("CV_FOLDS"), defaults.cv_folds)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(MaintenanceError::ConfigError(format!(
                "TEST_SIZE must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.search_iterations == 0 {
            return Err(MaintenanceError::ConfigError(
                "SEARCH_ITERATIONS must be at least 1".to_string(),
            ));
        }
        if self.cv_folds < 2 {
            return Err(MaintenanceError::ConfigError(format!(
                "CV_FOLDS must be at least 2, got {}",
                self.cv_folds
            )));
        }
        Ok(())
    }

    /// Builder method to set the local data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Builder method to set the local model directory
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    /// Builder method to set remote credentials and repositories
    pub fn with_hub(mut self, hub: HubSettings) -> Self {
        self.hub = hub;
        self
    }

    /// Builder method to set the tracking sink
    pub fn with_tracking(mut self, uri: impl Into<String>, experiment: impl Into<String>) -> Self {
        self.tracking_uri = uri.into();
        self.experiment_name = experiment.into();
        self
    }

    /// Builder method to set the test fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set the seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the search budget
    pub fn with_search(mut self, iterations: usize, cv_folds: usize) -> Self {
        self.search_iterations = iterations;
        self.cv_folds = cv_folds;
        self
    }

    /// Raw dataset in the local cache
    pub fn raw_data_file(&self) -> PathBuf {
        self.data_dir.join("engine_data.csv")
    }

    /// Directory holding the processed splits
    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    /// Train split in the local cache
    pub fn train_file(&self) -> PathBuf {
        self.processed_dir().join("train.csv")
    }

    /// Test split in the local cache
    pub fn test_file(&self) -> PathBuf {
        self.processed_dir().join("test.csv")
    }

    /// Trained pipeline in the local cache
    pub fn model_file(&self) -> PathBuf {
        self.models_dir.join("best_model.json")
    }

    /// Resolve a tracking URI into a directory.
    /// Accepts `file://` URIs and plain paths.
    pub fn tracking_dir(&self) -> Result<PathBuf> {
        let uri = self.tracking_uri.trim();
        if let Some(rest) = uri.strip_prefix("file://") {
            return Ok(Path::new(rest).to_path_buf());
        }
        if uri.contains("://") {
            return Err(MaintenanceError::ConfigError(format!(
                "unsupported tracking URI '{}': only file:// and plain paths are supported",
                uri
            )));
        }
        Ok(PathBuf::from(uri))
    }
}

fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| {
            MaintenanceError::ConfigError(format!("{} has an invalid value: '{}'", name, value))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.test_size, 0.2);
        assert_eq!(settings.random_state, 42);
        assert_eq!(settings.search_iterations, 20);
        assert_eq!(settings.cv_folds, 5);
        assert!(!settings.hub.has_credentials());
        assert_eq!(settings.model_file(), PathBuf::from("./models/best_model.json"));
    }

    #[test]
    fn test_repo_without_token_is_local_only() {
        let settings = Settings::from_lookup(lookup(&[
            ("HF_DATASET_REPO", "owner/engine-data"),
            ("HF_MODEL_REPO", "owner/engine-model"),
        ]))
        .unwrap();
        assert!(settings.hub.dataset_remote().is_none());
        assert!(settings.hub.model_remote().is_none());
    }

    #[test]
    fn test_token_enables_remote() {
        let settings = Settings::from_lookup(lookup(&[
            ("HF_TOKEN", "secret"),
            ("HF_MODEL_REPO", "owner/engine-model"),
        ]))
        .unwrap();
        assert_eq!(settings.hub.model_remote(), Some("owner/engine-model"));
        assert!(settings.hub.dataset_remote().is_none());
        assert!(!format!("{:?}", settings.hub).contains("secret"));
    }

    #[test]
    fn test_invalid_test_size() {
        let err = Settings::from_lookup(lookup(&[("TEST_SIZE", "1.5")])).unwrap_err();
        assert!(matches!(err, MaintenanceError::ConfigError(_)));

        let err = Settings::from_lookup(lookup(&[("TEST_SIZE", "abc")])).unwrap_err();
        assert!(matches!(err, MaintenanceError::ConfigError(_)));
    }

    #[test]
    fn test_tracking_dir() {
        let settings = Settings::default().with_tracking("file:///tmp/mlruns", "exp");
        assert_eq!(settings.tracking_dir().unwrap(), PathBuf::from("/tmp/mlruns"));

        let settings = Settings::default().with_tracking("runs", "exp");
        assert_eq!(settings.tracking_dir().unwrap(), PathBuf::from("runs"));

        let settings = Settings::default().with_tracking("http://tracker:5000", "exp");
        assert!(settings.tracking_dir().is_err());
    }
}
