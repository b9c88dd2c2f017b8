//! Error types for stoploop
//!
//! Centralized error handling using thiserror. Absent and malformed state
//! records are not errors; they are absorbed by the store and codec.

use std::path::PathBuf;

use thiserror::Error;

/// All error types that can occur in stoploop
#[derive(Debug, Error)]
pub enum StopLoopError {
    /// A loop record already exists where a new one was requested
    #[error("A loop is already active at {}", .0.display())]
    AlreadyActive(PathBuf),

    /// Caller supplied an unusable argument to the start operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for stoploop operations
pub type Result<T> = std::result::Result<T, StopLoopError>;
