//! Error types for the renderer.

use thiserror::Error;

/// Main error type for renderer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Scratch buffer or child node allocation failed while building a BVH
    #[error("Failed to allocate {what} for BVH construction ({faces} faces)")]
    BvhAlloc { what: &'static str, faces: usize },

    /// Render configuration value out of range
    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    /// Framebuffer dimensions must be non-zero
    #[error("Invalid framebuffer size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// Worker pool could not be created, or a render pass did not complete
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Texture decoding or image encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type alias for renderer operations.
pub type Result<T> = std::result::Result<T, Error>;
