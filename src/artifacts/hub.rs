//! Remote artifact store
//!
//! [`RemoteStore`] is the transport seam: fetch/store a file inside a
//! repository and create repositories on demand. [`HubStore`] speaks the
//! Hugging Face Hub HTTP API; [`RemoteBackend`] adapts any store to the
//! resolver's [`ArtifactBackend`] contract.

use super::{Artifact, ArtifactBackend, ArtifactKind};
use crate::config::HubSettings;
use crate::error::{MaintenanceError, Result};
use base64::Engine as _;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Transport to a remote repository store
pub trait RemoteStore: Send + Sync {
    /// Create the repository if it does not exist yet
    fn ensure_repo(&self, repo_id: &str, kind: ArtifactKind) -> Result<()>;

    /// Download a file from a repository
    fn fetch(&self, repo_id: &str, kind: ArtifactKind, path: &str) -> Result<Vec<u8>>;

    /// Upload a file into a repository
    fn store(&self, repo_id: &str, kind: ArtifactKind, path: &str, bytes: &[u8]) -> Result<()>;
}

/// Hugging Face Hub client
pub struct HubStore {
    client: Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for HubStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubStore")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HubStore {
    /// Build a client from hub settings. Requires a token.
    pub fn new(settings: &HubSettings) -> Result<Self> {
        let token = settings
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| MaintenanceError::ConfigError("remote token is not set (HF_TOKEN)".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("engine-maintenance/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MaintenanceError::RemoteError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn resolve_url(&self, repo_id: &str, kind: ArtifactKind, path: &str) -> String {
        let prefix = match kind {
            ArtifactKind::Dataset => "datasets/",
            ArtifactKind::Model => "",
        };
        format!("{}/{}{}/resolve/main/{}", self.endpoint, prefix, repo_id, path)
    }

    fn commit_url(&self, repo_id: &str, kind: ArtifactKind) -> String {
        format!("{}/api/{}s/{}/commit/main", self.endpoint, kind.as_str(), repo_id)
    }
}

impl RemoteStore for HubStore {
    fn ensure_repo(&self, repo_id: &str, kind: ArtifactKind) -> Result<()> {
        let (organization, name) = match repo_id.split_once('/') {
            Some((org, name)) => (Some(org), name),
            None => (None, repo_id),
        };

        let mut body = serde_json::json!({
            "name": name,
            "type": kind.as_str(),
            "private": false,
        });
        if let Some(org) = organization {
            body["organization"] = serde_json::Value::String(org.to_string());
        }

        let response = self
            .client
            .post(format!("{}/api/repos/create", self.endpoint))
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;

        // Conflict means the repository already exists
        if response.status() == StatusCode::CONFLICT {
            debug!(repo = repo_id, kind = %kind, "Remote repository already exists");
            return Ok(());
        }
        response.error_for_status()?;
        debug!(repo = repo_id, kind = %kind, "Created remote repository");
        Ok(())
    }

    fn fetch(&self, repo_id: &str, kind: ArtifactKind, path: &str) -> Result<Vec<u8>> {
        let url = self.resolve_url(repo_id, kind, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()?
            .error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    fn store(&self, repo_id: &str, kind: ArtifactKind, path: &str, bytes: &[u8]) -> Result<()> {
        let header = serde_json::json!({
            "key": "header",
            "value": { "summary": format!("Upload {}", path), "description": "" },
        });
        let file = serde_json::json!({
            "key": "file",
            "value": {
                "path": path,
                "encoding": "base64",
                "content": base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        });
        let body = format!("{}\n{}\n", header, file);

        self.client
            .post(self.commit_url(repo_id, kind))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

/// Adapts a [`RemoteStore`] to the resolver's backend contract
#[derive(Clone)]
pub struct RemoteBackend {
    store: Arc<dyn RemoteStore>,
    dataset_repo: Option<String>,
    model_repo: Option<String>,
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("dataset_repo", &self.dataset_repo)
            .field("model_repo", &self.model_repo)
            .finish()
    }
}

impl RemoteBackend {
    pub fn new(store: Arc<dyn RemoteStore>, dataset_repo: Option<String>, model_repo: Option<String>) -> Self {
        Self {
            store,
            dataset_repo,
            model_repo,
        }
    }

    /// Repository configured for an artifact's kind
    pub fn repo_for(&self, artifact: Artifact) -> Option<&str> {
        match artifact.kind() {
            ArtifactKind::Dataset => self.dataset_repo.as_deref(),
            ArtifactKind::Model => self.model_repo.as_deref(),
        }
    }

    fn require_repo(&self, artifact: Artifact) -> Result<&str> {
        self.repo_for(artifact).ok_or_else(|| {
            MaintenanceError::ConfigError(format!("no remote {} repository configured", artifact.kind()))
        })
    }
}

impl ArtifactBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn supports(&self, artifact: Artifact) -> bool {
        self.repo_for(artifact).is_some()
    }

    fn location(&self, artifact: Artifact) -> String {
        match self.repo_for(artifact) {
            Some(repo) => format!("{}:{}", repo, artifact.remote_path()),
            None => format!("no {} repository configured", artifact.kind()),
        }
    }

    fn fetch(&self, artifact: Artifact) -> Result<Vec<u8>> {
        let repo = self.require_repo(artifact)?;
        self.store.fetch(repo, artifact.kind(), artifact.remote_path())
    }

    fn store(&self, artifact: Artifact, bytes: &[u8]) -> Result<String> {
        let repo = self.require_repo(artifact)?;
        self.store.ensure_repo(repo, artifact.kind())?;
        self.store.store(repo, artifact.kind(), artifact.remote_path(), bytes)?;
        Ok(self.location(artifact))
    }
}
