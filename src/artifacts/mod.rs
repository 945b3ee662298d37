//! Artifact resolution
//!
//! Every persisted byproduct of the pipeline (raw dataset, train/test splits,
//! trained pipeline) is addressed by a logical [`Artifact`]. The
//! [`ArtifactResolver`] maps it to bytes on disk, preferring the remote store
//! when credentials are configured and falling back to the local cache.

mod hub;
mod local;
mod resolver;

pub use hub::{HubStore, RemoteBackend, RemoteStore};
pub use local::LocalCache;
pub use resolver::{ArtifactResolver, PublishAck, RemoteOutcome};

use crate::config::Settings;
use crate::error::{MaintenanceError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Repository kind in the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Dataset,
    Model,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Dataset => "dataset",
            ArtifactKind::Model => "model",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical artifact names known to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Artifact {
    RawDataset,
    TrainSplit,
    TestSplit,
    TrainedModel,
}

impl Artifact {
    /// Repository kind this artifact lives in
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::RawDataset | Artifact::TrainSplit | Artifact::TestSplit => ArtifactKind::Dataset,
            Artifact::TrainedModel => ArtifactKind::Model,
        }
    }

    /// Path inside the remote repository
    pub fn remote_path(&self) -> &'static str {
        match self {
            Artifact::RawDataset => "data/engine_data.csv",
            Artifact::TrainSplit => "data/train.csv",
            Artifact::TestSplit => "data/test.csv",
            Artifact::TrainedModel => "model.json",
        }
    }

    /// Canonical path in the local cache
    pub fn local_path(&self, settings: &Settings) -> PathBuf {
        match self {
            Artifact::RawDataset => settings.raw_data_file(),
            Artifact::TrainSplit => settings.train_file(),
            Artifact::TestSplit => settings.test_file(),
            Artifact::TrainedModel => settings.model_file(),
        }
    }

    /// Human-readable name used in logs and errors
    pub fn display_name(&self) -> &'static str {
        match self {
            Artifact::RawDataset => "raw dataset",
            Artifact::TrainSplit => "train split",
            Artifact::TestSplit => "test split",
            Artifact::TrainedModel => "trained model",
        }
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Where an artifact should be resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArtifactSource {
    /// Remote first when configured, local otherwise
    #[default]
    Auto,
    /// Local cache only
    Local,
    /// Remote first with local fallback; requires remote configuration
    Remote,
}

impl std::str::FromStr for ArtifactSource {
    type Err = MaintenanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ArtifactSource::Auto),
            "local" => Ok(ArtifactSource::Local),
            "remote" | "hf" | "hub" => Ok(ArtifactSource::Remote),
            other => Err(MaintenanceError::ConfigError(format!(
                "unknown artifact source '{}', expected auto, local or remote",
                other
            ))),
        }
    }
}

/// Storage backend for artifacts.
///
/// Implemented by the local cache and by the remote store adapter so the
/// resolver can treat them uniformly.
pub trait ArtifactBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Whether this backend can hold artifacts of the given kind
    fn supports(&self, artifact: Artifact) -> bool;

    /// Human-readable location of an artifact in this backend
    fn location(&self, artifact: Artifact) -> String;

    /// Read the artifact's bytes
    fn fetch(&self, artifact: Artifact) -> Result<Vec<u8>>;

    /// Write the artifact's bytes, returning the location written
    fn store(&self, artifact: Artifact, bytes: &[u8]) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_kinds() {
        assert_eq!(Artifact::RawDataset.kind(), ArtifactKind::Dataset);
        assert_eq!(Artifact::TestSplit.kind(), ArtifactKind::Dataset);
        assert_eq!(Artifact::TrainedModel.kind(), ArtifactKind::Model);
    }

    #[test]
    fn test_local_layout() {
        let settings = Settings::default().with_data_dir("d").with_models_dir("m");
        assert_eq!(Artifact::RawDataset.local_path(&settings), PathBuf::from("d/engine_data.csv"));
        assert_eq!(Artifact::TrainSplit.local_path(&settings), PathBuf::from("d/processed/train.csv"));
        assert_eq!(Artifact::TrainedModel.local_path(&settings), PathBuf::from("m/best_model.json"));
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!("local".parse::<ArtifactSource>().unwrap(), ArtifactSource::Local);
        assert_eq!("HF".parse::<ArtifactSource>().unwrap(), ArtifactSource::Remote);
        assert!("s3".parse::<ArtifactSource>().is_err());
    }
}
