//! Randomized search with stratified cross-validation

use super::config::TuningConfig;
use super::search_space::{HyperParams, SearchSpace};
use crate::error::Result;
use crate::training::cross_validation::{CVStrategy, CrossValidator};
use crate::training::metrics::f1_score;
use crate::training::{ForestParams, MaintenancePipeline, TrainingData};
use ndarray::Axis;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Outcome of one evaluated configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Position in the sampling order
    pub index: usize,
    pub params: HyperParams,
    /// F1 on each validation fold
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

/// All trials plus the winner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub best_index: usize,
    pub best_params: HyperParams,
    pub best_score: f64,
    pub trials: Vec<TrialResult>,
    pub elapsed_secs: f64,
}

impl SearchResult {
    pub fn best_trial(&self) -> &TrialResult {
        &self.trials[self.best_index]
    }
}

/// Randomized hyperparameter search over a discrete space
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    space: SearchSpace,
    config: TuningConfig,
}

impl RandomizedSearch {
    pub fn new(space: SearchSpace, config: TuningConfig) -> Self {
        Self { space, config }
    }

    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    /// Evaluate sampled configurations by k-fold F1 and pick the best mean.
    /// Ties go to the configuration sampled first.
    pub fn fit(&self, data: &TrainingData) -> Result<SearchResult> {
        let start = Instant::now();
        self.config.validate()?;

        let configs = self.space.sample(self.config.n_iter, self.config.random_state)?;
        let forest_params: Vec<ForestParams> = configs
            .iter()
            .map(ForestParams::from_hyperparams)
            .collect::<Result<_>>()?;

        let splits = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: self.config.cv_folds,
            shuffle: self.config.shuffle_folds,
        })
        .with_random_state(self.config.random_state)
        .split(&data.labels())?;

        info!(
            configurations = configs.len(),
            folds = splits.len(),
            rows = data.n_samples(),
            "Starting randomized search"
        );

        // Every (configuration, fold) pair is independent; the indexed
        // collect keeps results in sampling order
        let jobs: Vec<(usize, usize)> = (0..configs.len())
            .flat_map(|t| (0..splits.len()).map(move |f| (t, f)))
            .collect();

        let seed = self.config.random_state;
        let scores: Vec<f64> = jobs
            .par_iter()
            .map(|&(t, f)| {
                let split = &splits[f];
                let x_train = data.x.select(Axis(0), &split.train_indices);
                let y_train = data.y.select(Axis(0), &split.train_indices);
                let x_val = data.x.select(Axis(0), &split.test_indices);
                let y_val = data.y.select(Axis(0), &split.test_indices);

                let pipeline = MaintenancePipeline::fit(&x_train, &y_train, &forest_params[t], seed)?;
                f1_score(&y_val, &pipeline.predict(&x_val)?)
            })
            .collect::<Result<_>>()?;

        let n_folds = splits.len();
        let trials: Vec<TrialResult> = configs
            .into_iter()
            .enumerate()
            .map(|(index, params)| {
                let fold_scores = scores[index * n_folds..(index + 1) * n_folds].to_vec();
                let mean = fold_scores.iter().sum::<f64>() / n_folds as f64;
                let var = fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n_folds as f64;
                debug!(trial = index, mean_f1 = mean, "Evaluated configuration");
                TrialResult {
                    index,
                    params,
                    fold_scores,
                    mean_score: mean,
                    std_score: var.sqrt(),
                }
            })
            .collect();

        let mut best_index = 0;
        for trial in &trials {
            if trial.mean_score > trials[best_index].mean_score {
                best_index = trial.index;
            }
        }

        let best = &trials[best_index];
        info!(
            best_trial = best_index,
            best_mean_f1 = best.mean_score,
            "Randomized search complete"
        );

        Ok(SearchResult {
            best_index,
            best_params: best.params.clone(),
            best_score: best.mean_score,
            trials,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}
