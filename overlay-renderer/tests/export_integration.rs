//! Export Integration Tests
//!
//! Drives an editing session over a real PDF and bakes it with lopdf:
//! - Multi-page export and reload
//! - Zoom changes leave export geometry unchanged
//! - All-or-nothing failures

use std::io::Cursor;

use lopdf::{content::Content, dictionary, Document, Object, Stream};
use overlay_core::{
    transform::map_bounds, CoreError, CoreResult, EditorSession, ElementPatch, FixedAdvance,
    Point, RasterizationService, RenderedPage, SessionConfig, Size, TextStyle,
};
use overlay_renderer::{
    pdf::page_sizes, ExportConfig, ExportPipeline, FontBook, LopdfAuthoring, PdfDocument,
    RenderError,
};

/// Geometry-only page source backed by lopdf.
#[derive(Default)]
struct PdfGeometry {
    sizes: Vec<Size>,
}

impl RasterizationService for PdfGeometry {
    fn open(&mut self, bytes: &[u8]) -> CoreResult<u32> {
        self.sizes = page_sizes(bytes).map_err(|e| CoreError::Collaborator(e.to_string()))?;
        Ok(u32::try_from(self.sizes.len()).unwrap_or(0))
    }

    fn render_page(&mut self, page: u32, scale: f32) -> CoreResult<RenderedPage> {
        let size = self.page_size(page)?.scaled(scale);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (width, height) = (size.width as u32, size.height as u32);
        Ok(RenderedPage {
            bitmap: Vec::new(),
            width,
            height,
        })
    }

    fn page_size(&self, page: u32) -> CoreResult<Size> {
        self.sizes
            .get((page as usize).wrapping_sub(1))
            .copied()
            .ok_or_else(|| CoreError::Collaborator(format!("no page {page}")))
    }
}

/// Build a PDF whose pages each carry their own media box.
fn create_test_pdf(sizes: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for (width, height) in sizes {
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            Content { operations: vec![] }.encode().expect("encode"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (*width).into(), (*height).into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let count = i64::try_from(kids.len()).expect("count");
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save");
    bytes
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 255, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn session_for(pdf: &[u8]) -> EditorSession {
    let mut session = EditorSession::new(
        Box::<PdfGeometry>::default(),
        Box::new(FixedAdvance::default()),
        SessionConfig::default(),
    );
    session.open_document(pdf).expect("open");
    session
}

/// Names of image XObjects referenced from each page.
fn xobject_counts(bytes: &[u8]) -> Vec<usize> {
    let doc = Document::load_mem(bytes).expect("reload");
    doc.get_pages()
        .values()
        .map(|page_id| {
            let page = doc.get_dictionary(*page_id).expect("page");
            let resources = match page.get(b"Resources") {
                Ok(Object::Reference(id)) => doc.get_dictionary(*id).expect("resources"),
                Ok(Object::Dictionary(dict)) => dict,
                _ => return 0,
            };
            match resources.get(b"XObject") {
                Ok(Object::Dictionary(xobjects)) => xobjects.len(),
                _ => 0,
            }
        })
        .collect()
}

// ============================================================================
// Session To Document
// ============================================================================

#[test]
fn test_multi_page_session_exports() {
    let pdf = create_test_pdf(&[(612, 792), (842, 595), (612, 792)]);
    let mut session = session_for(&pdf);

    session.insert_image(png(40, 20)).expect("insert");
    session.next_page().expect("next");
    session.insert_image(png(10, 10)).expect("insert");
    session.insert_image(png(10, 10)).expect("insert");

    let pipeline = ExportPipeline::pdf(FontBook::new(), ExportConfig::default());
    let out = pipeline
        .export(&pdf, session.store(), &session.page_dimensions())
        .expect("export");

    assert!(out.starts_with(b"%PDF-"));
    assert_eq!(xobject_counts(&out), vec![1, 2, 0]);
    assert_eq!(
        page_sizes(&out).expect("sizes"),
        vec![
            Size::new(612.0, 792.0),
            Size::new(842.0, 595.0),
            Size::new(612.0, 792.0)
        ]
    );
}

#[test]
fn test_zoom_round_trip_keeps_export_identical() {
    let pdf = create_test_pdf(&[(612, 792)]);
    let mut session = session_for(&pdf);
    let text = session.create_text_element(1, Point::new(150.0, 300.0), "", TextStyle::default());
    session.insert_image(png(60, 60)).expect("insert");

    let pipeline = ExportPipeline::pdf(FontBook::new(), ExportConfig::default());
    let before_rect = map_bounds(&text.bounds, &session.page_dimensions()[&1]);
    let before = pipeline
        .export(&pdf, session.store(), &session.page_dimensions())
        .expect("export");

    // Zoom to the minimum, where a 200 x 40 box would shrink below 50 x 30.
    for _ in 0..4 {
        session.zoom_out().expect("zoom out");
    }
    let at_min = pipeline
        .export(&pdf, session.store(), &session.page_dimensions())
        .expect("export");
    for _ in 0..4 {
        session.zoom_in().expect("zoom in");
    }

    let moved = session.store().get(text.id).expect("element");
    assert_eq!(
        map_bounds(&moved.bounds, &session.page_dimensions()[&1]),
        before_rect
    );
    let after = pipeline
        .export(&pdf, session.store(), &session.page_dimensions())
        .expect("export");
    assert_eq!(before, at_min);
    assert_eq!(before, after);
}

#[test]
fn test_blank_text_exports_without_fonts() {
    let pdf = create_test_pdf(&[(612, 792)]);
    let mut session = session_for(&pdf);
    let text = session.create_text_element(1, Point::new(50.0, 50.0), "", TextStyle::default());
    session
        .update_element(text.id, &ElementPatch::position(Point::new(80.0, 90.0)))
        .expect("move");

    let pipeline = ExportPipeline::pdf(FontBook::new(), ExportConfig::default());
    let out = pipeline
        .export(&pdf, session.store(), &session.page_dimensions())
        .expect("export");
    assert_eq!(xobject_counts(&out), vec![1]);
    assert!(PdfDocument::load(&out).is_ok());
}

// ============================================================================
// Failure Modes
// ============================================================================

#[test]
fn test_text_without_fonts_fails_whole_export() {
    let pdf = create_test_pdf(&[(612, 792)]);
    let mut session = session_for(&pdf);
    session.insert_image(png(20, 20)).expect("insert");
    session.create_text_element(1, Point::new(10.0, 10.0), "Hi", TextStyle::default());

    let pipeline = ExportPipeline::pdf(FontBook::new(), ExportConfig::default());
    let result = pipeline.export(&pdf, session.store(), &session.page_dimensions());
    assert!(matches!(result, Err(RenderError::Export(_))));
}

#[test]
fn test_unsupported_image_surfaces_at_export() {
    let pdf = create_test_pdf(&[(612, 792)]);
    let mut session = session_for(&pdf);
    session.create_image_element(1, Point::new(0.0, 0.0), b"BM\0\0\0\0".to_vec(), 50.0, 50.0);

    let pipeline = ExportPipeline::new(
        LopdfAuthoring,
        overlay_renderer::GlyphRasterizer::new(FontBook::new(), 2.0, 1.4),
    );
    assert!(matches!(
        pipeline.export(&pdf, session.store(), &session.page_dimensions()),
        Err(RenderError::UnsupportedImageFormat(_))
    ));
}
