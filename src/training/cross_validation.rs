//! Cross-validation splitters

use crate::error::{MaintenanceError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// Contiguous K-Fold
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold {
            n_splits: 5,
            shuffle: false,
        }
    }
}

impl CVStrategy {
    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::KFold { n_splits, .. } | CVStrategy::StratifiedKFold { n_splits, .. } => *n_splits,
        }
    }
}

/// A single train/validation split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: u64,
}

impl CrossValidator {
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: 42,
        }
    }

    /// Set random state used when shuffling
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Generate splits over `labels.len()` rows
    pub fn split(&self, labels: &[i64]) -> Result<Vec<CVSplit>> {
        let n_samples = labels.len();
        let n_splits = self.strategy.n_splits();
        if n_splits < 2 {
            return Err(MaintenanceError::ConfigError("n_splits must be at least 2".to_string()));
        }
        if n_samples < n_splits {
            return Err(MaintenanceError::ValidationError(format!(
                "cannot run {}-fold cross-validation on {} rows",
                n_splits, n_samples
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let fold_of: Vec<usize> = match self.strategy {
            CVStrategy::KFold { shuffle, .. } => {
                let mut order: Vec<usize> = (0..n_samples).collect();
                if shuffle {
                    order.shuffle(&mut rng);
                }
                let mut fold_of = vec![0; n_samples];
                let mut start = 0;
                for fold in 0..n_splits {
                    let size = n_samples / n_splits + usize::from(fold < n_samples % n_splits);
                    for &idx in &order[start..start + size] {
                        fold_of[idx] = fold;
                    }
                    start += size;
                }
                fold_of
            }
            CVStrategy::StratifiedKFold { shuffle, .. } => {
                let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
                for (idx, &label) in labels.iter().enumerate() {
                    by_class.entry(label).or_default().push(idx);
                }

                // Deal each class round-robin, continuing the fold counter
                // across classes so fold sizes stay balanced
                let mut fold_of = vec![0; n_samples];
                let mut next = 0;
                for indices in by_class.values_mut() {
                    if shuffle {
                        indices.shuffle(&mut rng);
                    }
                    for &idx in indices.iter() {
                        fold_of[idx] = next;
                        next = (next + 1) % n_splits;
                    }
                }
                fold_of
            }
        };

        Ok((0..n_splits)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| fold_of[i] == fold_idx);
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect())
    }
}
