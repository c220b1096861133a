//! Error types for fairway-crop.

use thiserror::Error;

/// Result type for fairway-crop operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for fairway-crop operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The image could not be decoded or encoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The aspect string is neither `a:b` nor a positive number.
    #[error("Invalid aspect ratio: {0}")]
    InvalidAspect(String),

    /// The crop rectangle has no area.
    #[error("Crop rectangle is empty")]
    EmptyCrop,

    /// The operation is not valid in the session's current state.
    #[error("Invalid crop session state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    /// The file cannot be opened in the cropper.
    #[error("Not a croppable image: {0}")]
    NotAnImage(String),
}

impl Error {
    /// Create an invalid aspect error.
    pub fn invalid_aspect(msg: impl Into<String>) -> Self {
        Self::InvalidAspect(msg.into())
    }
}
