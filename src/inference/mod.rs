//! Inference service module
//!
//! Scores single engine readings against the trained maintenance pipeline:
//! - Remote-first model resolution with local fallback
//! - One cached pipeline per artifact source
//! - Feature maps in any order, missing sensors default to 0.0
//! - NaN and infinite readings are rejected before scoring
//! - Fixed 0.5 decision threshold on the positive-class probability

mod config;
mod engine;

pub use config::InferenceConfig;
pub use engine::{build_input_row, validate_features, InferenceEngine, Prediction};

use crate::artifacts::ArtifactSource;
use crate::config::Settings;
use crate::error::Result;
use std::collections::HashMap;

/// One-shot prediction with a fresh engine built from settings
pub fn predict(
    settings: &Settings,
    features: &HashMap<String, f64>,
    source: Option<ArtifactSource>,
) -> Result<Prediction> {
    InferenceEngine::new(settings, InferenceConfig::default())?.predict(features, source)
}
