//! Contract for the document authoring collaborator.

use overlay_core::{ExportRect, ImageFormat};

use crate::error::RenderResult;

/// Handle to an image embedded in an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageRef(usize);

impl ImageRef {
    /// Create a handle from an implementation-defined index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Implementation-defined index of the image.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Opens a source document, places raster images on its pages and
/// serializes the result.
pub trait AuthoringService {
    /// An open, mutable document.
    type Document;

    /// Parse a source document.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be parsed.
    fn open(&self, bytes: &[u8]) -> RenderResult<Self::Document>;

    /// Number of pages in the document.
    fn page_count(&self, document: &Self::Document) -> u32;

    /// Embed an encoded image, returning a handle for drawing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be embedded.
    fn embed_image(
        &self,
        document: &mut Self::Document,
        bytes: &[u8],
        format: ImageFormat,
    ) -> RenderResult<ImageRef>;

    /// Draw an embedded image on a page (0-based) into `rect`, given in page
    /// points with a bottom-left origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the page or image does not exist.
    fn draw_image(
        &self,
        document: &mut Self::Document,
        page_index: u32,
        image: ImageRef,
        rect: ExportRect,
    ) -> RenderResult<()>;

    /// Serialize the document to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn serialize(&self, document: Self::Document) -> RenderResult<Vec<u8>>;
}
