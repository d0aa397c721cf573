//! Error types for the text-watermark crate.

use std::path::PathBuf;

/// Errors that can occur while building or applying a watermark.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is missing, malformed or out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A font file could not be read or parsed.
    #[error("failed to load font {}: {reason}", path.display())]
    FontLoad {
        /// Path of the font that failed to load.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// The watermark text rendered no visible pixels.
    #[error("watermark mark is empty; check the mark text and font")]
    EmptyMark,

    /// The measured text has zero width or height.
    #[error("text bounds are empty")]
    EmptyTextBounds,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
