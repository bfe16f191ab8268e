//! Error types for the chargecheck library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chargecheck operations.
///
/// Every variant is fatal to the run that produced it. Per-rule failures
/// never surface here; they are recorded on their own `CheckResult`.
#[derive(Debug, Error)]
pub enum ChargecheckError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Empty file or no header to read.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration or rule document error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl ChargecheckError {
    /// Wrap an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChargecheckError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for chargecheck operations.
pub type Result<T> = std::result::Result<T, ChargecheckError>;
