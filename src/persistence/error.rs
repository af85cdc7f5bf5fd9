//! Error types for persistence operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or saving annotation data.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image bytes could not be decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Requested image does not exist in the dataset
    #[error("Image not found: {path:?}")]
    ImageNotFound {
        /// Path where the image was expected
        path: PathBuf,
    },

    /// The persistence worker is gone
    #[error("Persistence worker disconnected")]
    Disconnected,

    /// Failure injected by a test backend
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl PersistenceError {
    /// Create an image-not-found error.
    pub fn image_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ImageNotFound { path: path.into() }
    }
}
