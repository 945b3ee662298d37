//! Stratified train/test split

use crate::error::{MaintenanceError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Split configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// Seed for the per-class shuffles
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
        }
    }
}

impl SplitConfig {
    pub fn new(test_size: f64, random_state: u64) -> Self {
        Self { test_size, random_state }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(MaintenanceError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        Ok(())
    }
}

/// Row indices of each partition, in ascending order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Deterministic stratified splitter
#[derive(Debug, Clone)]
pub struct StratifiedSplitter {
    config: SplitConfig,
}

impl StratifiedSplitter {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Split rows by label so that each class keeps its proportion in both
    /// partitions (within rounding).
    pub fn split(&self, labels: &[i64]) -> Result<SplitIndices> {
        self.config.validate()?;

        let n = labels.len();
        let n_test = (self.config.test_size * n as f64).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(MaintenanceError::ValidationError(format!(
                "cannot split {} rows with test_size {}: a partition would be empty",
                n, self.config.test_size
            )));
        }

        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in labels.iter().enumerate() {
            by_class.entry(label).or_default().push(idx);
        }

        let allocation = allocate(&by_class, n, n_test);

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        let mut train = Vec::with_capacity(n - n_test);
        let mut test = Vec::with_capacity(n_test);

        for (class, indices) in by_class.iter_mut() {
            indices.shuffle(&mut rng);
            let k = allocation.get(class).copied().unwrap_or(0);
            test.extend_from_slice(&indices[..k]);
            train.extend_from_slice(&indices[k..]);
        }

        train.sort_unstable();
        test.sort_unstable();

        Ok(SplitIndices { train, test })
    }
}

/// Largest-remainder allocation of `n_test` rows across classes.
/// Ties in the remainder go to the smaller label.
fn allocate(by_class: &BTreeMap<i64, Vec<usize>>, n: usize, n_test: usize) -> BTreeMap<i64, usize> {
    let mut allocation: BTreeMap<i64, usize> = BTreeMap::new();
    let mut remainders: Vec<(f64, i64)> = Vec::with_capacity(by_class.len());
    let mut assigned = 0usize;

    for (&class, indices) in by_class {
        let quota = n_test as f64 * indices.len() as f64 / n as f64;
        let base = (quota.floor() as usize).min(indices.len());
        allocation.insert(class, base);
        assigned += base;
        remainders.push((quota - quota.floor(), class));
    }

    remainders.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });

    let mut left = n_test.saturating_sub(assigned);
    while left > 0 {
        let before = left;
        for &(_, class) in &remainders {
            if left == 0 {
                break;
            }
            let capacity = by_class[&class].len();
            if let Some(slot) = allocation.get_mut(&class) {
                if *slot < capacity {
                    *slot += 1;
                    left -= 1;
                }
            }
        }
        if left == before {
            break;
        }
    }

    allocation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n0: usize, n1: usize) -> Vec<i64> {
        let mut y = vec![0i64; n0];
        y.extend(vec![1i64; n1]);
        y
    }

    #[test]
    fn test_sizes_and_disjoint() {
        let y = labels(70, 30);
        let split = StratifiedSplitter::new(SplitConfig::default()).split(&y).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        assert!(split.test.iter().all(|i| !split.train.contains(i)));
    }

    #[test]
    fn test_class_proportions_preserved() {
        let y = labels(70, 30);
        let split = StratifiedSplitter::new(SplitConfig::default()).split(&y).unwrap();

        let test_pos = split.test.iter().filter(|&&i| y[i] == 1).count();
        let train_pos = split.train.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(test_pos, 6);
        assert_eq!(train_pos, 24);
    }

    #[test]
    fn test_deterministic() {
        let y: Vec<i64> = (0..57).map(|i| (i % 3 == 0) as i64).collect();
        let splitter = StratifiedSplitter::new(SplitConfig::new(0.25, 7));
        assert_eq!(splitter.split(&y).unwrap(), splitter.split(&y).unwrap());

        let other = StratifiedSplitter::new(SplitConfig::new(0.25, 8)).split(&y).unwrap();
        assert_eq!(other.test.len(), splitter.split(&y).unwrap().test.len());
    }

    #[test]
    fn test_largest_remainder() {
        // 10 rows, 3 test rows: quotas 1.8 / 1.2 → 2 / 1
        let y = labels(6, 4);
        let split = StratifiedSplitter::new(SplitConfig::new(0.3, 1)).split(&y).unwrap();
        let test_pos = split.test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(split.test.len(), 3);
        assert_eq!(test_pos, 1);
    }

    #[test]
    fn test_too_few_rows() {
        let err = StratifiedSplitter::new(SplitConfig::default()).split(&[1]).unwrap_err();
        assert!(matches!(err, MaintenanceError::ValidationError(_)));
    }

    #[test]
    fn test_invalid_fraction() {
        let err = StratifiedSplitter::new(SplitConfig::new(0.0, 1)).split(&[0, 1]).unwrap_err();
        assert!(matches!(err, MaintenanceError::ConfigError(_)));
    }
}
