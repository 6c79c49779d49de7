//! PDF authoring with lopdf.
//!
//! Images become image XObjects (JPEG passed through as `DCTDecode`, PNG
//! decoded and stored as Flate-compressed RGB plus a soft mask). Each draw
//! appends a small content stream to the page. The page's original content
//! is wrapped in `q`/`Q` the first time it is drawn on, so a dangling
//! transformation in the source cannot displace the overlay.

use std::collections::HashSet;
use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};
use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream,
};
use overlay_core::{ExportRect, ImageFormat, Size};

use crate::{
    authoring::{AuthoringService, ImageRef},
    error::{RenderError, RenderResult},
    image::{jpeg_info, load_image_from_bytes},
};

/// Page size used when a page has no readable `MediaBox`.
pub const US_LETTER: Size = Size::new(612.0, 792.0);

/// Limit on `Parent` hops when resolving inherited page attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// A page's media box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Lower-left x.
    pub x: f32,
    /// Lower-left y.
    pub y: f32,
    /// Width in points.
    pub width: f32,
    /// Height in points.
    pub height: f32,
}

impl PageBox {
    /// Width and height.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// An open PDF being written to.
#[derive(Debug)]
pub struct PdfDocument {
    doc: Document,
    pages: Vec<ObjectId>,
    images: Vec<(String, ObjectId)>,
    wrapped: HashSet<ObjectId>,
}

impl PdfDocument {
    /// Parse a PDF.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Export`] if the bytes are not a readable PDF.
    pub fn load(bytes: &[u8]) -> RenderResult<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| RenderError::export("PDF parse error", e))?;
        let pages = doc.get_pages().into_values().collect();
        Ok(Self {
            doc,
            pages,
            images: Vec::new(),
            wrapped: HashSet::new(),
        })
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    /// Media box of a page (0-based), inherited from the page tree if needed.
    #[must_use]
    pub fn page_box(&self, page_index: usize) -> Option<PageBox> {
        let page_id = *self.pages.get(page_index)?;
        let media_box = self.inherited(page_id, b"MediaBox")?;
        let values = self.resolve(media_box).as_array().ok()?;
        if values.len() != 4 {
            return None;
        }
        let mut corners = [0.0_f32; 4];
        for (slot, value) in corners.iter_mut().zip(values) {
            *slot = self.number(value)?;
        }
        Some(PageBox {
            x: corners[0].min(corners[2]),
            y: corners[1].min(corners[3]),
            width: (corners[2] - corners[0]).abs(),
            height: (corners[3] - corners[1]).abs(),
        })
    }

    /// Sizes of every page in points. Pages without a readable media box
    /// report US Letter.
    #[must_use]
    pub fn page_sizes(&self) -> Vec<Size> {
        (0..self.pages.len())
            .map(|index| {
                self.page_box(index).map_or_else(
                    || {
                        tracing::warn!(page = index + 1, "no MediaBox, assuming US Letter");
                        US_LETTER
                    },
                    |page_box| page_box.size(),
                )
            })
            .collect()
    }

    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.doc.get_object(page_id).ok()?.as_dict().ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = current.get(key) {
                return Some(value);
            }
            let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
            current = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        }
        None
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(object),
            _ => object,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn number(&self, object: &Object) -> Option<f32> {
        match self.resolve(object) {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> RenderResult<&mut Dictionary> {
        self.doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| RenderError::export("page is not a dictionary", e))
    }

    /// Make sure the page owns a resource dictionary and return where it lives.
    fn resources_location(&mut self, page_id: ObjectId) -> RenderResult<Option<ObjectId>> {
        let existing = self
            .doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| RenderError::export("page is not a dictionary", e))?
            .get(b"Resources")
            .ok()
            .cloned();
        match existing {
            Some(Object::Reference(id)) => Ok(Some(id)),
            Some(Object::Dictionary(_)) => Ok(None),
            _ => {
                let inherited = self
                    .inherited(page_id, b"Resources")
                    .and_then(|object| self.resolve(object).as_dict().ok())
                    .cloned()
                    .unwrap_or_default();
                self.page_dict_mut(page_id)?
                    .set("Resources", Object::Dictionary(inherited));
                Ok(None)
            }
        }
    }

    fn resources_mut(
        &mut self,
        page_id: ObjectId,
        location: Option<ObjectId>,
    ) -> RenderResult<&mut Dictionary> {
        let object = match location {
            Some(id) => self.doc.get_object_mut(id),
            None => self.page_dict_mut(page_id)?.get_mut(b"Resources"),
        };
        object
            .and_then(Object::as_dict_mut)
            .map_err(|e| RenderError::export("invalid page resources", e))
    }

    fn register_xobject(
        &mut self,
        page_id: ObjectId,
        name: &str,
        image_id: ObjectId,
    ) -> RenderResult<()> {
        let location = self.resources_location(page_id)?;
        let shared = match self.resources_mut(page_id, location)?.get(b"XObject") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        if let Some(id) = shared {
            self.doc
                .get_object_mut(id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| RenderError::export("invalid XObject dictionary", e))?
                .set(name, Object::Reference(image_id));
            return Ok(());
        }

        let resources = self.resources_mut(page_id, location)?;
        if let Ok(Object::Dictionary(xobjects)) = resources.get_mut(b"XObject") {
            xobjects.set(name, Object::Reference(image_id));
        } else {
            resources.set("XObject", dictionary! { name => Object::Reference(image_id) });
        }
        Ok(())
    }

    fn content_refs(&self, page_id: ObjectId) -> RenderResult<Vec<Object>> {
        let page = self
            .doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| RenderError::export("page is not a dictionary", e))?;
        Ok(match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        })
    }

    fn append_content(
        &mut self,
        page_id: ObjectId,
        mut operations: Vec<Operation>,
    ) -> RenderResult<()> {
        let mut contents = self.content_refs(page_id)?;
        if self.wrapped.insert(page_id) {
            let save = self
                .doc
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            contents.insert(0, Object::Reference(save));
            operations.insert(0, Operation::new("Q", vec![]));
        }
        let encoded = Content { operations }
            .encode()
            .map_err(|e| RenderError::export("content stream encoding failed", e))?;
        let stream = self.doc.add_object(Stream::new(Dictionary::new(), encoded));
        contents.push(Object::Reference(stream));
        self.page_dict_mut(page_id)?
            .set("Contents", Object::Array(contents));
        Ok(())
    }

    fn embed_jpeg(&mut self, bytes: &[u8]) -> RenderResult<ObjectId> {
        let info = jpeg_info(bytes)?;
        let color_space = if info.grayscale { "DeviceGray" } else { "DeviceRGB" };
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(info.width),
            "Height" => i64::from(info.height),
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        Ok(self.doc.add_object(Stream::new(dict, bytes.to_vec())))
    }

    fn embed_png(&mut self, bytes: &[u8]) -> RenderResult<ObjectId> {
        let decoded = load_image_from_bytes(bytes)?;
        let (rgb, alpha) = decoded.split_alpha();
        let image_dict = |color_space: &str| {
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(decoded.width),
                "Height" => i64::from(decoded.height),
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            }
        };

        let mut dict = image_dict("DeviceRGB");
        if let Some(alpha) = alpha {
            let mask = self
                .doc
                .add_object(Stream::new(image_dict("DeviceGray"), deflate(&alpha)?));
            dict.set("SMask", Object::Reference(mask));
        }
        Ok(self.doc.add_object(Stream::new(dict, deflate(&rgb)?)))
    }
}

fn deflate(data: &[u8]) -> RenderResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| RenderError::export("compression failed", e))?;
    encoder
        .finish()
        .map_err(|e| RenderError::export("compression failed", e))
}

/// [`AuthoringService`] writing PDFs with lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfAuthoring;

impl AuthoringService for LopdfAuthoring {
    type Document = PdfDocument;

    fn open(&self, bytes: &[u8]) -> RenderResult<PdfDocument> {
        PdfDocument::load(bytes)
    }

    fn page_count(&self, document: &PdfDocument) -> u32 {
        document.page_count()
    }

    fn embed_image(
        &self,
        document: &mut PdfDocument,
        bytes: &[u8],
        format: ImageFormat,
    ) -> RenderResult<ImageRef> {
        let id = match format {
            ImageFormat::Jpeg => document.embed_jpeg(bytes)?,
            ImageFormat::Png => document.embed_png(bytes)?,
        };
        let index = document.images.len();
        document.images.push((format!("OverlayIm{}", index + 1), id));
        Ok(ImageRef::new(index))
    }

    fn draw_image(
        &self,
        document: &mut PdfDocument,
        page_index: u32,
        image: ImageRef,
        rect: ExportRect,
    ) -> RenderResult<()> {
        let index = usize::try_from(page_index).unwrap_or(usize::MAX);
        let page_id = *document.pages.get(index).ok_or_else(|| {
            RenderError::Export(format!("page index {page_index} is out of range"))
        })?;
        let (name, image_id) = document
            .images
            .get(image.index())
            .cloned()
            .ok_or_else(|| RenderError::Export(format!("unknown image {}", image.index())))?;
        let origin = document
            .page_box(index)
            .map_or((0.0, 0.0), |page_box| (page_box.x, page_box.y));

        document.register_xobject(page_id, &name, image_id)?;
        document.append_content(
            page_id,
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(rect.width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(rect.height),
                        Object::Real(rect.x + origin.0),
                        Object::Real(rect.y + origin.1),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        )
    }

    fn serialize(&self, mut document: PdfDocument) -> RenderResult<Vec<u8>> {
        let mut output = Vec::new();
        document
            .doc
            .save_to(&mut output)
            .map_err(|e| RenderError::export("Failed to save PDF", e))?;
        Ok(output)
    }
}

/// Read the page sizes of a PDF.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if the bytes are not a readable PDF.
pub fn page_sizes(bytes: &[u8]) -> RenderResult<Vec<Size>> {
    Ok(PdfDocument::load(bytes)?.page_sizes())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a PDF with `pages` pages of the given size. The media box sits
    /// on the page tree root so it is inherited.
    pub(crate) fn create_test_pdf(pages: usize, width: i64, height: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for i in 0..pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Td", vec![Object::Integer(72), Object::Integer(72)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            format!("Page {}", i + 1).into_bytes(),
                            lopdf::StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                content.encode().expect("encode content"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "Contents" => Object::Reference(content_id),
            });
            kids.push(Object::Reference(page_id));
        }
        let count = i64::try_from(kids.len()).expect("page count");
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("save test pdf");
        buffer
    }

    pub(crate) fn red_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(8, 4, image::Rgba([255, 0, 0, 128]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn test_inherited_media_box() {
        let pdf = create_test_pdf(2, 595, 842);
        let sizes = page_sizes(&pdf).expect("sizes");
        assert_eq!(sizes, vec![Size::new(595.0, 842.0); 2]);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            PdfDocument::load(b"not a pdf"),
            Err(RenderError::Export(_))
        ));
    }

    #[test]
    fn test_draw_wraps_original_content_once() {
        let authoring = LopdfAuthoring;
        let mut document = authoring
            .open(&create_test_pdf(1, 612, 792))
            .expect("open");
        let image = authoring
            .embed_image(&mut document, &red_png(), ImageFormat::Png)
            .expect("embed");
        let rect = ExportRect {
            x: 10.0,
            y: 20.0,
            width: 30.0,
            height: 40.0,
        };
        authoring
            .draw_image(&mut document, 0, image, rect)
            .expect("draw");
        authoring
            .draw_image(&mut document, 0, image, rect)
            .expect("draw again");

        let page_id = document.pages[0];
        // q stream, original content, two draws.
        assert_eq!(document.content_refs(page_id).expect("contents").len(), 4);

        let bytes = authoring.serialize(document).expect("serialize");
        assert!(bytes.starts_with(b"%PDF-"));
        let reloaded = Document::load_mem(&bytes).expect("reload");
        assert_eq!(reloaded.get_pages().len(), 1);
    }

    #[test]
    fn test_draw_out_of_range_page() {
        let authoring = LopdfAuthoring;
        let mut document = authoring
            .open(&create_test_pdf(1, 612, 792))
            .expect("open");
        let image = authoring
            .embed_image(&mut document, &red_png(), ImageFormat::Png)
            .expect("embed");
        let rect = ExportRect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        };
        assert!(matches!(
            authoring.draw_image(&mut document, 3, image, rect),
            Err(RenderError::Export(_))
        ));
    }
}
