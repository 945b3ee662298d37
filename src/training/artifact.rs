//! Persisted pipeline format
//!
//! The pipeline is serialized to JSON and wrapped in an envelope carrying a
//! format version, the feature schema and a SHA-256 of the payload text.

use super::metrics::ClassificationMetrics;
use super::pipeline::MaintenancePipeline;
use super::random_forest::ForestParams;
use crate::artifacts::LocalCache;
use crate::error::{MaintenanceError, Result};
use crate::preprocessing::FEATURE_COLUMNS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Current envelope version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// On-disk envelope around a serialized pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub features: Vec<String>,
    pub params: ForestParams,
    /// Held-out metrics of the run that produced this artifact
    pub metrics: Option<ClassificationMetrics>,
    pub sha256: String,
    payload: String,
}

fn checksum(payload: &str) -> String {
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}

impl ModelArtifact {
    /// Wrap a fitted pipeline
    pub fn new(pipeline: &MaintenancePipeline, metrics: Option<ClassificationMetrics>) -> Result<Self> {
        let payload = serde_json::to_string(pipeline)?;
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            features: pipeline.feature_names().to_vec(),
            params: pipeline.params().clone(),
            metrics,
            sha256: checksum(&payload),
            payload,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse an envelope, rejecting unknown versions and bad checksums
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(MaintenanceError::SerializationError(format!(
                "unsupported artifact format version {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if checksum(&artifact.payload) != artifact.sha256 {
            return Err(MaintenanceError::SerializationError(
                "artifact checksum mismatch".to_string(),
            ));
        }
        Ok(artifact)
    }

    /// Decode the pipeline and check it matches the published schema
    pub fn pipeline(&self) -> Result<MaintenancePipeline> {
        if self.features.iter().map(String::as_str).ne(FEATURE_COLUMNS.iter().copied()) {
            return Err(MaintenanceError::SchemaError(format!(
                "artifact features {:?} do not match {:?}",
                self.features, FEATURE_COLUMNS
            )));
        }
        let pipeline: MaintenancePipeline = serde_json::from_str(&self.payload)?;
        if pipeline.feature_names() != self.features.as_slice() {
            return Err(MaintenanceError::SchemaError(
                "pipeline features disagree with the artifact header".to_string(),
            ));
        }
        Ok(pipeline)
    }

    /// Replace the file at `path` through a temp file and rename
    pub fn write_to(&self, path: &Path) -> Result<()> {
        LocalCache::write_file(path, &self.to_bytes()?)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}

/// Serialize a pipeline into artifact bytes
pub fn serialize_pipeline(pipeline: &MaintenancePipeline) -> Result<Vec<u8>> {
    ModelArtifact::new(pipeline, None)?.to_bytes()
}

/// Decode artifact bytes into a pipeline
pub fn deserialize_pipeline(bytes: &[u8]) -> Result<MaintenancePipeline> {
    ModelArtifact::from_bytes(bytes)?.pipeline()
}
