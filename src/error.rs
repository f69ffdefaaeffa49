//! Error types for the detection and visualization pipeline

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias used throughout the library
pub type Result<T> = std::result::Result<T, DetectionError>;

#[derive(Error, Debug)]
pub enum DetectionError {
    /// File missing, corrupt, or in a format we cannot decode
    #[error("Unreadable image {}: {reason}", path.display())]
    UnreadableImage { path: PathBuf, reason: String },

    /// Array shape outside the supported stack-of-planes model
    #[error("Unsupported dimensionality: {0}")]
    UnsupportedDimensionality(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

impl DetectionError {
    pub fn unreadable(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::UnreadableImage {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported_dimensionality<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedDimensionality(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Errors raised while getting the input into memory.
    ///
    /// The detector downgrades these to a negative result; everything else
    /// is a genuine failure and propagates.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::UnreadableImage { .. } | Self::UnsupportedDimensionality(_)
        )
    }
}
