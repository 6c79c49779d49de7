//! Renderer error types.

use overlay_core::CoreError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while rasterizing or exporting.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An image payload is neither PNG nor JPEG.
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    /// Embedding, drawing or serialization failed. No output was produced.
    #[error("Export failed: {0}")]
    Export(String),

    /// A font could not be loaded or has no usable glyphs.
    #[error("Font error: {0}")]
    Font(String),

    /// Error from the overlay core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RenderError {
    /// Wrap any displayable error as an export failure.
    pub(crate) fn export(context: &str, error: impl std::fmt::Display) -> Self {
        Self::Export(format!("{context}: {error}"))
    }
}
