//! Inference configuration

use crate::artifacts::ArtifactSource;
use serde::{Deserialize, Serialize};

/// Configuration for the inference service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Probability at or above which the label is 1
    pub classification_threshold: f64,

    /// Source used when a call does not name one; `None` means auto
    pub default_source: Option<ArtifactSource>,

    /// Keep deserialized pipelines across calls
    pub cache_model: bool,

    /// Log inputs outside the documented sensor ranges
    pub warn_out_of_range: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            classification_threshold: 0.5,
            default_source: None,
            cache_model: true,
            warn_out_of_range: true,
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default artifact source
    pub fn with_default_source(mut self, source: ArtifactSource) -> Self {
        self.default_source = Some(source);
        self
    }

    /// Enable or disable pipeline caching
    pub fn with_cache_model(mut self, cache: bool) -> Self {
        self.cache_model = cache;
        self
    }

    /// Enable or disable range warnings
    pub fn with_warn_out_of_range(mut self, warn: bool) -> Self {
        self.warn_out_of_range = warn;
        self
    }
}
