//! Error types for the engine maintenance pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, MaintenanceError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum MaintenanceError {
    /// Artifact missing from every location that was tried
    #[error("Artifact '{artifact}' not found (remote: {remote}; local: {})", local.display())]
    NotFound {
        artifact: String,
        remote: String,
        local: PathBuf,
    },

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Remote store error: {0}")]
    RemoteError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl From<polars::error::PolarsError> for MaintenanceError {
    fn from(err: polars::error::PolarsError) -> Self {
        MaintenanceError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for MaintenanceError {
    fn from(err: serde_json::Error) -> Self {
        MaintenanceError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for MaintenanceError {
    fn from(err: reqwest::Error) -> Self {
        MaintenanceError::RemoteError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MaintenanceError {
    fn from(err: ndarray::ShapeError) -> Self {
        MaintenanceError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
