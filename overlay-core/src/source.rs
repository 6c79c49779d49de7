//! Contract for the page rasterization collaborator.

use crate::{CoreResult, Size};

/// A rendered page bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// RGBA8 pixels, row-major.
    pub bitmap: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Turns pages of a source document into displayable bitmaps.
///
/// Implementations report failures as [`crate::CoreError::Collaborator`]
/// (or [`crate::CoreError::InvalidInputFormat`] when the bytes cannot be opened).
pub trait RasterizationService {
    /// Open a document and return its page count.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed.
    fn open(&mut self, bytes: &[u8]) -> CoreResult<u32>;

    /// Render a page (1-based) at `scale` times its native size.
    ///
    /// # Errors
    ///
    /// Returns an error if no document is open or the page cannot be rendered.
    fn render_page(&mut self, page: u32, scale: f32) -> CoreResult<RenderedPage>;

    /// Native size of a page (1-based), in points.
    ///
    /// # Errors
    ///
    /// Returns an error if no document is open or the page does not exist.
    fn page_size(&self, page: u32) -> CoreResult<Size>;
}
