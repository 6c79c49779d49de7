//! Export of committed elements into the source document.
//!
//! Pages are visited in ascending order and elements in store (z) order.
//! Images are embedded as-is; text is rasterized offline and embedded as a
//! PNG placed over the element's box. Any failure aborts the whole export,
//! so callers either get a complete document or an error.

use std::collections::BTreeMap;

use overlay_core::{
    transform::{map_bounds, to_export},
    upload::validate_document,
    Element, ElementKind, ElementStore, ExportRect, ImageFormat, PageMapping,
};

use crate::{
    authoring::AuthoringService,
    error::{RenderError, RenderResult},
    font::FontBook,
    image::detect_format,
    pdf::LopdfAuthoring,
    text::{GlyphRasterizer, TextRasterizer},
};

/// Configuration for export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportConfig {
    /// Text raster resolution relative to overlay pixels.
    pub supersample: f32,
    /// Line height as a multiple of the font size.
    pub line_height_factor: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            supersample: 2.0,
            line_height_factor: overlay_core::measure::LINE_HEIGHT_FACTOR,
        }
    }
}

/// Bakes elements into a document through an [`AuthoringService`].
#[derive(Debug)]
pub struct ExportPipeline<A, R> {
    authoring: A,
    rasterizer: R,
}

impl ExportPipeline<LopdfAuthoring, GlyphRasterizer> {
    /// Pipeline writing PDFs with lopdf and drawing text with `fonts`.
    #[must_use]
    pub fn pdf(fonts: FontBook, config: ExportConfig) -> Self {
        if fonts.is_empty() {
            tracing::warn!("no fonts loaded; visible text elements will fail to export");
        }
        Self::new(
            LopdfAuthoring,
            GlyphRasterizer::new(fonts, config.supersample, config.line_height_factor),
        )
    }
}

impl<A: AuthoringService, R: TextRasterizer> ExportPipeline<A, R> {
    /// Create a pipeline from its collaborators.
    #[must_use]
    pub fn new(authoring: A, rasterizer: R) -> Self {
        Self {
            authoring,
            rasterizer,
        }
    }

    /// Export every element of `store` onto `source`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Core`] if `source` is not a PDF,
    /// [`RenderError::UnsupportedImageFormat`] for image payloads that are
    /// neither PNG nor JPEG, and [`RenderError::Export`] for every other
    /// failure. No bytes are returned on error.
    pub fn export(
        &self,
        source: &[u8],
        store: &ElementStore,
        pages: &BTreeMap<u32, PageMapping>,
    ) -> RenderResult<Vec<u8>> {
        self.export_pages(source, store.pages(), pages)
    }

    /// Export elements grouped by page number onto `source`.
    ///
    /// # Errors
    ///
    /// See [`ExportPipeline::export`].
    pub fn export_pages<'a>(
        &self,
        source: &[u8],
        elements_by_page: impl IntoIterator<Item = (u32, &'a [Element])>,
        pages: &BTreeMap<u32, PageMapping>,
    ) -> RenderResult<Vec<u8>> {
        validate_document(source)?;
        let ordered: BTreeMap<u32, &[Element]> = elements_by_page.into_iter().collect();
        let mut document = self
            .authoring
            .open(source)
            .map_err(|e| RenderError::export("cannot open source document", e))?;
        let page_count = self.authoring.page_count(&document);

        let mut drawn = 0_usize;
        for (page, elements) in ordered {
            if elements.is_empty() {
                continue;
            }
            if page == 0 || page > page_count {
                return Err(RenderError::Export(format!(
                    "page {page} does not exist (document has {page_count} pages)"
                )));
            }
            let mapping = pages
                .get(&page)
                .filter(|mapping| mapping.is_valid())
                .ok_or_else(|| RenderError::Export(format!("no page geometry for page {page}")))?;

            for element in elements {
                self.draw_element(&mut document, page, element, mapping)
                    .map_err(|e| match e {
                        RenderError::UnsupportedImageFormat(_) => e,
                        RenderError::Export(message) => RenderError::Export(format!(
                            "page {page}, element {}: {message}",
                            element.id
                        )),
                        other => RenderError::Export(format!(
                            "page {page}, element {}: {other}",
                            element.id
                        )),
                    })?;
                drawn += 1;
            }
        }

        let bytes = self
            .authoring
            .serialize(document)
            .map_err(|e| RenderError::export("serialization failed", e))?;
        tracing::info!(elements = drawn, bytes = bytes.len(), "export complete");
        Ok(bytes)
    }

    fn draw_element(
        &self,
        document: &mut A::Document,
        page: u32,
        element: &Element,
        mapping: &PageMapping,
    ) -> RenderResult<()> {
        let (image, rect) = match &element.kind {
            ElementKind::Image {
                data,
                intrinsic_width,
                intrinsic_height,
            } => {
                let format = detect_format(data)?;
                let image = self.authoring.embed_image(document, data, format)?;
                let scale = mapping.scale();
                let origin = to_export(element.bounds.origin(), *intrinsic_height, mapping);
                let rect = ExportRect {
                    x: origin.x,
                    y: origin.y,
                    width: intrinsic_width * scale,
                    height: intrinsic_height * scale,
                };
                (image, rect)
            }
            ElementKind::Text { content, style } => {
                let raster = self
                    .rasterizer
                    .rasterize(content, style, element.bounds.size())?;
                let image = self
                    .authoring
                    .embed_image(document, &raster.png, ImageFormat::Png)?;
                (image, map_bounds(&element.bounds, mapping))
            }
        };
        tracing::debug!(id = %element.id, page, ?rect, "element placed");
        self.authoring.draw_image(document, page - 1, image, rect)
    }
}
