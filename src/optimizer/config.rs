//! Tuning configuration

use crate::config::Settings;
use crate::error::{MaintenanceError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the randomized hyperparameter search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Number of configurations to sample
    pub n_iter: usize,

    /// Cross-validation folds for evaluation
    pub cv_folds: usize,

    /// Seed for sampling and for every model fit
    pub random_state: u64,

    /// Shuffle rows before assigning folds
    pub shuffle_folds: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            n_iter: 20,
            cv_folds: 5,
            random_state: 42,
            shuffle_folds: false,
        }
    }
}

impl TuningConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Tuning settings from the process configuration
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            n_iter: settings.search_iterations,
            cv_folds: settings.cv_folds,
            random_state: settings.random_state,
            ..Self::default()
        }
    }

    /// Set number of sampled configurations
    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    /// Set number of folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Set random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Shuffle rows before fold assignment
    pub fn with_shuffle_folds(mut self, shuffle: bool) -> Self {
        self.shuffle_folds = shuffle;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_iter == 0 {
            return Err(MaintenanceError::ConfigError("n_iter must be at least 1".to_string()));
        }
        if self.cv_folds < 2 {
            return Err(MaintenanceError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        Ok(())
    }
}
