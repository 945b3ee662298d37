//! Local filesystem cache backend

use super::{Artifact, ArtifactBackend};
use crate::config::Settings;
use crate::error::{MaintenanceError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Local artifact cache rooted at the configured data and model directories
#[derive(Debug, Clone)]
pub struct LocalCache {
    settings: Settings,
}

impl LocalCache {
    /// Create a cache over the settings' directories
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Canonical path of an artifact
    pub fn path(&self, artifact: Artifact) -> PathBuf {
        artifact.local_path(&self.settings)
    }

    /// Where a copy fetched from the remote store is materialized.
    /// Kept apart from the canonical path so a remote download never
    /// overwrites a locally produced artifact.
    pub fn mirror_path(&self, artifact: Artifact) -> PathBuf {
        let root = match artifact.kind() {
            super::ArtifactKind::Dataset => &self.settings.data_dir,
            super::ArtifactKind::Model => &self.settings.models_dir,
        };
        root.join("remote").join(artifact.remote_path())
    }

    /// Whether the canonical copy exists
    pub fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).is_file()
    }

    /// Write bytes to `path`, creating parent directories.
    /// Goes through a sibling temp file so readers never see a partial write.
    pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl ArtifactBackend for LocalCache {
    fn name(&self) -> &'static str {
        "local"
    }

    fn supports(&self, _artifact: Artifact) -> bool {
        true
    }

    fn location(&self, artifact: Artifact) -> String {
        self.path(artifact).display().to_string()
    }

    fn fetch(&self, artifact: Artifact) -> Result<Vec<u8>> {
        let path = self.path(artifact);
        if !path.is_file() {
            return Err(MaintenanceError::NotFound {
                artifact: artifact.to_string(),
                remote: "not attempted".to_string(),
                local: path,
            });
        }
        Ok(fs::read(&path)?)
    }

    fn store(&self, artifact: Artifact, bytes: &[u8]) -> Result<String> {
        let path = self.path(artifact);
        Self::write_file(&path, bytes)?;
        Ok(path.display().to_string())
    }
}
