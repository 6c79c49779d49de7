//! Validation of user-supplied documents and images.

use std::io::Cursor;

use image::ImageReader;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, ImageFormat, Size};

/// Magic header every PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Caps applied to uploaded images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Largest accepted image payload, in bytes.
    pub max_image_bytes: usize,
    /// Box an inserted image is scaled down to fit, in overlay pixels.
    pub max_display: Size,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: 10 * 1024 * 1024,
            max_display: Size::new(300.0, 300.0),
        }
    }
}

/// Check that `bytes` look like a PDF document.
///
/// # Errors
///
/// Returns [`CoreError::InvalidInputFormat`] if the PDF header is missing.
pub fn validate_document(bytes: &[u8]) -> CoreResult<()> {
    if bytes.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(CoreError::InvalidInputFormat(
            "document does not start with a %PDF- header".to_string(),
        ))
    }
}

/// A validated image upload with its pixel dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    /// Encoded payload.
    pub data: Vec<u8>,
    /// Detected format.
    pub format: ImageFormat,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

impl ImageUpload {
    /// Validate an uploaded image and read its dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInputFormat`] for anything but a readable
    /// PNG or JPEG, and [`CoreError::SizeLimitExceeded`] when the payload is
    /// over the cap.
    pub fn from_bytes(data: Vec<u8>, limits: &UploadLimits) -> CoreResult<Self> {
        let format = ImageFormat::sniff(&data).ok_or_else(|| {
            CoreError::InvalidInputFormat("only PNG and JPEG images can be inserted".to_string())
        })?;
        if data.len() > limits.max_image_bytes {
            return Err(CoreError::SizeLimitExceeded {
                size: data.len(),
                limit: limits.max_image_bytes,
            });
        }

        let (width, height) = ImageReader::new(Cursor::new(&data))
            .with_guessed_format()
            .map_err(|e| CoreError::InvalidInputFormat(e.to_string()))?
            .into_dimensions()
            .map_err(|e| CoreError::InvalidInputFormat(e.to_string()))?;
        tracing::debug!(?format, width, height, bytes = data.len(), "image upload accepted");

        Ok(Self {
            data,
            format,
            width,
            height,
        })
    }

    /// Size to show the image at: scaled down to fit inside `max`, keeping
    /// the aspect ratio. Small images keep their pixel size.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn display_size(&self, max: Size) -> Size {
        let natural = Size::new(self.width as f32, self.height as f32);
        if natural.width <= max.width && natural.height <= max.height {
            return natural;
        }
        let ratio = (max.width / natural.width).min(max.height / natural.height);
        natural.scaled(ratio)
    }
}
