//! Error types for torchscript-rs.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for torchscript-rs operations.
pub type Result<T> = std::result::Result<T, TorchScriptError>;

/// Errors that can occur while loading or running a model.
#[derive(Debug, Error)]
pub enum TorchScriptError {
    /// Model deserialization failed.
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    /// Forward pass failed.
    #[error("Forward pass failed: {0}")]
    Inference(String),

    /// Tensor creation or access failed.
    #[error("Invalid tensor: {0}")]
    Tensor(String),

    /// Buffer length does not match the requested shape.
    #[error("Shape mismatch: shape implies {expected} elements but buffer holds {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Malformed or incomplete model artifact.
    #[error("Invalid artifact: {0}")]
    Artifact(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("Base64 decoding error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl TorchScriptError {
    /// Create a model load error.
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create an inference error.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a tensor error.
    pub fn tensor(msg: impl Into<String>) -> Self {
        Self::Tensor(msg.into())
    }

    /// Create an artifact error.
    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
