//! Error types for config persistence.

use catalogsync_types::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur reading or writing a config file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but its syntax is invalid for its format.
    #[error("invalid syntax in configuration file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// The extension does not map to a supported format.
    #[error("unsupported file format: '{0}'. Please use .yml, .yaml, .json or .ts")]
    UnsupportedFormat(String),

    /// The file parsed but failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Filesystem error.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config could not be rendered.
    #[error("serialization error: {0}")]
    Serialization(String),
}
