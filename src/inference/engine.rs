//! Inference engine implementation
//!
//! Resolves the trained pipeline (remote first when configured), keeps one
//! deserialized copy per source, and scores single feature maps.

use super::InferenceConfig;
use crate::artifacts::{Artifact, ArtifactResolver, ArtifactSource};
use crate::config::Settings;
use crate::error::{MaintenanceError, Result};
use crate::preprocessing::{FEATURE_COLUMNS, FEATURE_SCHEMA, N_FEATURES};
use crate::training::{deserialize_pipeline, MaintenancePipeline};
use ndarray::Array2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 = requires maintenance, 0 = normal
    pub label: i64,
    /// Probability of label 1
    pub probability: f64,
}

impl Prediction {
    /// Threshold a positive-class probability
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        Self {
            label: i64::from(probability >= threshold),
            probability,
        }
    }

    pub fn requires_maintenance(&self) -> bool {
        self.label == 1
    }
}

/// Build a single input row in canonical feature order.
/// Missing names become 0.0; unknown names are ignored.
pub fn build_input_row(features: &HashMap<String, f64>) -> Array2<f64> {
    for name in features.keys() {
        if !FEATURE_COLUMNS.contains(&name.as_str()) {
            debug!(feature = %name, "Ignoring unknown feature");
        }
    }

    let row: Vec<f64> = FEATURE_COLUMNS
        .iter()
        .map(|name| features.get(*name).copied().unwrap_or(0.0))
        .collect();
    Array2::from_shape_vec((1, N_FEATURES), row).unwrap_or_else(|_| Array2::zeros((1, N_FEATURES)))
}

/// Reject NaN and infinite readings for known features
pub fn validate_features(features: &HashMap<String, f64>) -> Result<()> {
    let mut bad: Vec<String> = FEATURE_COLUMNS
        .iter()
        .filter_map(|name| features.get(*name).map(|v| (name, v)))
        .filter(|(_, v)| !v.is_finite())
        .map(|(name, v)| format!("{}={}", name, v))
        .collect();
    if bad.is_empty() {
        return Ok(());
    }
    bad.sort();
    Err(MaintenanceError::ValidationError(format!(
        "feature values must be finite: {}",
        bad.join(", ")
    )))
}

/// Inference service over the trained maintenance pipeline
pub struct InferenceEngine {
    config: InferenceConfig,
    resolver: ArtifactResolver,
    cache: RwLock<HashMap<ArtifactSource, Arc<MaintenancePipeline>>>,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("config", &self.config)
            .field("cached_sources", &self.cache.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl InferenceEngine {
    /// Engine with a resolver built from settings
    pub fn new(settings: &Settings, config: InferenceConfig) -> Result<Self> {
        Ok(Self::with_resolver(ArtifactResolver::new(settings)?, config))
    }

    /// Engine over an explicit resolver
    pub fn with_resolver(resolver: ArtifactResolver, config: InferenceConfig) -> Self {
        Self {
            config,
            resolver,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Concrete source for a request: auto becomes remote when a model
    /// repository and token are configured, local otherwise
    pub fn effective_source(&self, source: Option<ArtifactSource>) -> Result<ArtifactSource> {
        let requested = source.or(self.config.default_source).unwrap_or_default();
        let has_remote = self.resolver.has_remote(Artifact::TrainedModel);
        match requested {
            ArtifactSource::Auto if has_remote => Ok(ArtifactSource::Remote),
            ArtifactSource::Auto | ArtifactSource::Local => Ok(ArtifactSource::Local),
            ArtifactSource::Remote if has_remote => Ok(ArtifactSource::Remote),
            ArtifactSource::Remote => Err(MaintenanceError::ConfigError(
                "remote model source requested but no model repository and token are configured".to_string(),
            )),
        }
    }

    /// Resolve and decode the pipeline for a source, using the cache
    pub fn load_pipeline(&self, source: Option<ArtifactSource>) -> Result<Arc<MaintenancePipeline>> {
        let source = self.effective_source(source)?;

        if let Some(pipeline) = self.cache.read().get(&source) {
            return Ok(Arc::clone(pipeline));
        }

        let path = self
            .resolver
            .resolve_from(Artifact::TrainedModel, source)
            .map_err(|e| match e {
                MaintenanceError::ConfigError(_) => e,
                other => MaintenanceError::ModelUnavailable(other.to_string()),
            })?;
        let bytes = std::fs::read(&path).map_err(|e| {
            MaintenanceError::ModelUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let pipeline = Arc::new(deserialize_pipeline(&bytes).map_err(|e| {
            MaintenanceError::ModelUnavailable(format!("cannot decode {}: {}", path.display(), e))
        })?);

        info!(source = ?source, path = %path.display(), "Loaded maintenance pipeline");
        if self.config.cache_model {
            self.cache.write().insert(source, Arc::clone(&pipeline));
        }
        Ok(pipeline)
    }

    /// Predict the maintenance label for one feature map
    pub fn predict(&self, features: &HashMap<String, f64>, source: Option<ArtifactSource>) -> Result<Prediction> {
        let pipeline = self.load_pipeline(source)?;
        self.predict_with(&pipeline, features)
    }

    /// Predict against an already loaded pipeline
    pub fn predict_with(&self, pipeline: &MaintenancePipeline, features: &HashMap<String, f64>) -> Result<Prediction> {
        validate_features(features)?;

        if self.config.warn_out_of_range {
            for spec in FEATURE_SCHEMA.iter() {
                if let Some(&value) = features.get(spec.name) {
                    if !spec.in_range(value) {
                        warn!(feature = spec.name, value, min = spec.min, max = spec.max, "Feature outside documented range");
                    }
                }
            }
        }

        let row = build_input_row(features);
        let probability = pipeline.predict_proba(&row)?[0];
        let prediction = Prediction::from_probability(probability, self.config.classification_threshold);
        debug!(label = prediction.label, probability, "Prediction");
        Ok(prediction)
    }

    /// Drop all cached pipelines
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Number of cached pipelines
    pub fn cached_sources(&self) -> usize {
        self.cache.read().len()
    }
}
