//! Hyperparameter optimization module
//!
//! Randomized search over a discrete, declarative search space, scored by
//! stratified k-fold F1 on the training partition.

mod config;
mod random_search;
mod search_space;

pub use config::TuningConfig;
pub use random_search::{RandomizedSearch, SearchResult, TrialResult};
pub use search_space::{HyperParams, Parameter, ParameterValue, SearchSpace};
