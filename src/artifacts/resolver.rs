//! Remote-first artifact resolver with local fallback

use super::{Artifact, ArtifactBackend, ArtifactSource, HubStore, LocalCache, RemoteBackend, RemoteStore};
use crate::config::Settings;
use crate::error::{MaintenanceError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of the remote half of a publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteOutcome {
    /// Stored at the given remote location
    Stored { location: String },
    /// No remote repository or credentials for this artifact
    NotConfigured,
    /// Remote store failed; the local copy is still in place
    Failed { reason: String },
}

/// Acknowledgement returned by [`ArtifactResolver::publish`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishAck {
    pub artifact: Artifact,
    pub local_path: PathBuf,
    pub remote: RemoteOutcome,
}

impl PublishAck {
    pub fn remote_stored(&self) -> bool {
        matches!(self.remote, RemoteOutcome::Stored { .. })
    }
}

/// Resolves logical artifacts against a remote backend and the local cache.
///
/// Stateless apart from the files it reads and writes.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    local: LocalCache,
    remote: Option<RemoteBackend>,
}

impl ArtifactResolver {
    /// Build a resolver from settings. The remote backend is only enabled
    /// when a token and at least one repository are configured.
    pub fn new(settings: &Settings) -> Result<Self> {
        let hub = &settings.hub;
        if hub.dataset_remote().is_none() && hub.model_remote().is_none() {
            debug!("No remote credentials configured, resolving artifacts locally");
            return Ok(Self::local_only(settings));
        }
        let store: Arc<dyn RemoteStore> = Arc::new(HubStore::new(hub)?);
        Ok(Self::with_remote_store(settings, store))
    }

    /// Resolver that never touches the remote store
    pub fn local_only(settings: &Settings) -> Self {
        Self {
            local: LocalCache::new(settings),
            remote: None,
        }
    }

    /// Resolver over an explicit remote store, using the repositories from settings.
    /// Repositories are ignored when no token is configured.
    pub fn with_remote_store(settings: &Settings, store: Arc<dyn RemoteStore>) -> Self {
        let hub = &settings.hub;
        let dataset_repo = hub.dataset_remote().map(str::to_string);
        let model_repo = hub.model_remote().map(str::to_string);
        let remote = if dataset_repo.is_some() || model_repo.is_some() {
            Some(RemoteBackend::new(store, dataset_repo, model_repo))
        } else {
            None
        };
        Self {
            local: LocalCache::new(settings),
            remote,
        }
    }

    /// Local cache backend
    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    /// Canonical local path of an artifact
    pub fn local_path(&self, artifact: Artifact) -> PathBuf {
        self.local.path(artifact)
    }

    /// Whether a remote repository is configured for this artifact
    pub fn has_remote(&self, artifact: Artifact) -> bool {
        self.remote_for(artifact).is_some()
    }

    fn remote_for(&self, artifact: Artifact) -> Option<&RemoteBackend> {
        self.remote.as_ref().filter(|r| r.supports(artifact))
    }

    /// Resolve with the default source preference
    pub fn resolve(&self, artifact: Artifact) -> Result<PathBuf> {
        self.resolve_from(artifact, ArtifactSource::Auto)
    }

    /// Resolve an artifact to a readable local path.
    ///
    /// Remote failures are logged and fall through to the local cache; only
    /// when the local copy is missing too does this return `NotFound`.
    pub fn resolve_from(&self, artifact: Artifact, source: ArtifactSource) -> Result<PathBuf> {
        let remote = match source {
            ArtifactSource::Local => None,
            ArtifactSource::Auto => self.remote_for(artifact),
            ArtifactSource::Remote => Some(self.remote_for(artifact).ok_or_else(|| {
                MaintenanceError::ConfigError(format!(
                    "remote source requested for the {} but no remote {} repository and token are configured",
                    artifact,
                    artifact.kind()
                ))
            })?),
        };

        let mut remote_attempt = "not configured".to_string();
        if let Some(remote) = remote {
            remote_attempt = remote.location(artifact);
            match self.fetch_remote(remote, artifact) {
                Ok(path) => {
                    info!(artifact = %artifact, location = %remote_attempt, "Resolved artifact from remote store");
                    return Ok(path);
                }
                Err(e) => {
                    warn!(artifact = %artifact, error = %e, "Remote fetch failed, falling back to local cache");
                }
            }
        }

        let local = self.local.path(artifact);
        if local.is_file() {
            debug!(artifact = %artifact, path = %local.display(), "Resolved artifact from local cache");
            return Ok(local);
        }

        Err(MaintenanceError::NotFound {
            artifact: artifact.to_string(),
            remote: remote_attempt,
            local,
        })
    }

    fn fetch_remote(&self, remote: &RemoteBackend, artifact: Artifact) -> Result<PathBuf> {
        let bytes = remote.fetch(artifact)?;
        let path = self.local.mirror_path(artifact);
        LocalCache::write_file(&path, &bytes)?;
        Ok(path)
    }

    /// Publish a local file under a logical artifact name.
    ///
    /// The canonical local copy is always written first. A remote failure is
    /// logged and reported in the acknowledgement, never returned as an error.
    pub fn publish(&self, local_path: &Path, artifact: Artifact) -> Result<PublishAck> {
        let bytes = fs::read(local_path)?;
        let canonical = self.local.path(artifact);
        if !same_file(local_path, &canonical) {
            LocalCache::write_file(&canonical, &bytes)?;
        }

        let remote = match self.remote_for(artifact) {
            None => RemoteOutcome::NotConfigured,
            Some(remote) => match remote.store(artifact, &bytes) {
                Ok(location) => {
                    info!(artifact = %artifact, location = %location, "Published artifact to remote store");
                    RemoteOutcome::Stored { location }
                }
                Err(e) => {
                    warn!(artifact = %artifact, error = %e, "Failed to publish artifact to remote store");
                    RemoteOutcome::Failed { reason: e.to_string() }
                }
            },
        };

        Ok(PublishAck {
            artifact,
            local_path: canonical,
            remote,
        })
    }

    /// Upload a local file to the remote store, failing if that is not possible.
    /// Used to register the raw dataset, where the remote copy is the point.
    pub fn register(&self, local_path: &Path, artifact: Artifact) -> Result<String> {
        let remote = self.remote_for(artifact).ok_or_else(|| {
            MaintenanceError::ConfigError(format!(
                "registering the {} needs a remote {} repository and token",
                artifact,
                artifact.kind()
            ))
        })?;
        if !local_path.is_file() {
            return Err(MaintenanceError::NotFound {
                artifact: artifact.to_string(),
                remote: "not attempted".to_string(),
                local: local_path.to_path_buf(),
            });
        }
        let bytes = fs::read(local_path)?;
        let location = remote.store(artifact, &bytes)?;
        info!(artifact = %artifact, location = %location, "Registered artifact in remote store");
        Ok(location)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactKind;
    use crate::config::HubSettings;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Remote store that fails every call
    struct UnreachableStore;

    impl RemoteStore for UnreachableStore {
        fn ensure_repo(&self, _: &str, _: ArtifactKind) -> Result<()> {
            Err(MaintenanceError::RemoteError("connection refused".to_string()))
        }
        fn fetch(&self, _: &str, _: ArtifactKind, _: &str) -> Result<Vec<u8>> {
            Err(MaintenanceError::RemoteError("connection refused".to_string()))
        }
        fn store(&self, _: &str, _: ArtifactKind, _: &str, _: &[u8]) -> Result<()> {
            Err(MaintenanceError::RemoteError("connection refused".to_string()))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        files: Mutex<HashMap<(String, String), Vec<u8>>>,
        repos: Mutex<Vec<String>>,
    }

    impl RemoteStore for MemoryStore {
        fn ensure_repo(&self, repo: &str, _: ArtifactKind) -> Result<()> {
            let mut repos = self.repos.lock();
            if !repos.iter().any(|r| r == repo) {
                repos.push(repo.to_string());
            }
            Ok(())
        }
        fn fetch(&self, repo: &str, _: ArtifactKind, path: &str) -> Result<Vec<u8>> {
            self.files
                .lock()
                .get(&(repo.to_string(), path.to_string()))
                .cloned()
                .ok_or_else(|| MaintenanceError::RemoteError("404".to_string()))
        }
        fn store(&self, repo: &str, _: ArtifactKind, path: &str, bytes: &[u8]) -> Result<()> {
            self.files
                .lock()
                .insert((repo.to_string(), path.to_string()), bytes.to_vec());
            Ok(())
        }
    }

    fn settings(dir: &Path, with_token: bool) -> Settings {
        Settings::default()
            .with_data_dir(dir.join("data"))
            .with_models_dir(dir.join("models"))
            .with_hub(HubSettings {
                token: with_token.then(|| "token".to_string()),
                dataset_repo: Some("owner/engine-data".to_string()),
                model_repo: Some("owner/engine-model".to_string()),
                ..HubSettings::default()
            })
    }

    #[test]
    fn test_failing_remote_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), true);
        let resolver = ArtifactResolver::with_remote_store(&settings, Arc::new(UnreachableStore));
        LocalCache::write_file(&settings.model_file(), b"{}").unwrap();

        let path = resolver.resolve(Artifact::TrainedModel).unwrap();
        assert_eq!(path, settings.model_file());
    }

    #[test]
    fn test_not_found_names_both_locations() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), true);
        let resolver = ArtifactResolver::with_remote_store(&settings, Arc::new(UnreachableStore));

        match resolver.resolve(Artifact::TrainSplit).unwrap_err() {
            MaintenanceError::NotFound { remote, local, .. } => {
                assert_eq!(remote, "owner/engine-data:data/train.csv");
                assert_eq!(local, settings.train_file());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_remote_hit_is_materialized_in_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), true);
        let store = Arc::new(MemoryStore::default());
        store
            .store("owner/engine-model", ArtifactKind::Model, "model.json", b"remote")
            .unwrap();
        LocalCache::write_file(&settings.model_file(), b"local").unwrap();

        let resolver = ArtifactResolver::with_remote_store(&settings, store);
        let path = resolver.resolve(Artifact::TrainedModel).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"remote");
        // Canonical local copy untouched
        assert_eq!(fs::read(settings.model_file()).unwrap(), b"local");

        let path = resolver.resolve_from(Artifact::TrainedModel, ArtifactSource::Local).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"local");
    }

    #[test]
    fn test_remote_source_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), false);
        let resolver = ArtifactResolver::new(&settings).unwrap();
        assert!(!resolver.has_remote(Artifact::TrainedModel));

        let err = resolver
            .resolve_from(Artifact::TrainedModel, ArtifactSource::Remote)
            .unwrap_err();
        assert!(matches!(err, MaintenanceError::ConfigError(_)));
    }

    #[test]
    fn test_publish_keeps_local_copy_on_remote_failure() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), true);
        let resolver = ArtifactResolver::with_remote_store(&settings, Arc::new(UnreachableStore));

        let src = dir.path().join("candidate.json");
        fs::write(&src, b"pipeline").unwrap();
        let ack = resolver.publish(&src, Artifact::TrainedModel).unwrap();

        assert!(matches!(ack.remote, RemoteOutcome::Failed { .. }));
        assert_eq!(fs::read(&ack.local_path).unwrap(), b"pipeline");
    }

    #[test]
    fn test_publish_creates_repo_and_stores() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), true);
        let store = Arc::new(MemoryStore::default());
        let resolver = ArtifactResolver::with_remote_store(&settings, store.clone());

        LocalCache::write_file(&settings.test_file(), b"x\n1\n").unwrap();
        let ack = resolver.publish(&settings.test_file(), Artifact::TestSplit).unwrap();
        assert!(ack.remote_stored());
        assert_eq!(store.repos.lock().as_slice(), &["owner/engine-data".to_string()]);

        // Second publish does not duplicate the repository
        resolver.publish(&settings.test_file(), Artifact::TestSplit).unwrap();
        assert_eq!(store.repos.lock().len(), 1);
    }

    #[test]
    fn test_register_requires_remote() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), false);
        let resolver = ArtifactResolver::local_only(&settings);
        let err = resolver
            .register(&settings.raw_data_file(), Artifact::RawDataset)
            .unwrap_err();
        assert!(matches!(err, MaintenanceError::ConfigError(_)));
    }
}
