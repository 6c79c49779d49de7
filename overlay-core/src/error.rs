//! Error types for overlay operations.

use thiserror::Error;

use crate::ElementId;

/// Result type for overlay operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in overlay operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An upload is not the expected document or image type.
    #[error("Invalid input format: {0}")]
    InvalidInputFormat(String),

    /// An image payload is neither PNG nor JPEG.
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    /// An upload is larger than the configured cap.
    #[error("Size limit exceeded: {size} bytes (limit {limit} bytes)")]
    SizeLimitExceeded {
        /// Size of the rejected payload in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// Element not found in the store.
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    /// Invalid operation on an element.
    #[error("Invalid operation on element: {0}")]
    InvalidOperation(String),

    /// A gesture was started while another one is still active.
    #[error("Gesture rejected: {0}")]
    GestureRejected(String),

    /// Snapshot serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An external collaborator (page rasterizer) failed.
    #[error("Collaborator failed: {0}")]
    Collaborator(String),
}
