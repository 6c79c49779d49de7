//! CLI Integration Tests
//!
//! Runs commands against files in a temporary directory:
//! - `info` on a generated PDF
//! - `export` of an image-only snapshot
//! - Failures leave no output behind

use std::io::Cursor;
use std::path::Path;

use clap::Parser;
use lopdf::{dictionary, Document, Object};
use overlay_cli::{describe, run, Cli};
use overlay_core::{ElementStore, Point, TextStyle};
use tempfile::TempDir;

fn write_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            }))
        })
        .collect();
    let count = i64::try_from(kids.len()).expect("count");
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save pdf");
}

fn png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 16, image::Rgb([0, 128, 0]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("pdf-overlay").chain(args.iter().copied()))
        .expect("parse arguments")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

// ============================================================================
// Info
// ============================================================================

#[test]
fn test_info_lists_pages() {
    let dir = TempDir::new().expect("tempdir");
    let pdf = dir.path().join("in.pdf");
    write_pdf(&pdf, 3);

    let summary = describe(&std::fs::read(&pdf).expect("read")).expect("describe");
    assert!(summary.starts_with("pages: 3\n"));
    assert_eq!(summary.matches("612 x 792 pt").count(), 3);

    run(cli(&["info", path_str(&pdf)])).expect("info");
}

#[test]
fn test_info_missing_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("missing.pdf");
    assert!(run(cli(&["info", path_str(&missing)])).is_err());
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn test_export_image_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let source = dir.path().join("in.pdf");
    let elements = dir.path().join("elements.json");
    let out = dir.path().join("out.pdf");
    write_pdf(&source, 2);

    let mut store = ElementStore::new();
    store.create_image(2, Point::new(100.0, 100.0), png(), 64.0, 64.0);
    std::fs::write(&elements, store.to_json().expect("json")).expect("write snapshot");

    run(cli(&[
        "export",
        "--source",
        path_str(&source),
        "--elements",
        path_str(&elements),
        "--out",
        path_str(&out),
        "--zoom",
        "1.5",
    ]))
    .expect("export");

    let bytes = std::fs::read(&out).expect("read output");
    assert!(bytes.starts_with(b"%PDF-"));
    let doc = Document::load_mem(&bytes).expect("reload");
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn test_export_text_without_font_writes_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let source = dir.path().join("in.pdf");
    let elements = dir.path().join("elements.json");
    let out = dir.path().join("out.pdf");
    write_pdf(&source, 1);

    let mut store = ElementStore::new();
    store.create_text(1, Point::new(10.0, 10.0), "Signed", TextStyle::default());
    std::fs::write(&elements, store.to_json().expect("json")).expect("write snapshot");

    let result = run(cli(&[
        "export",
        "--source",
        path_str(&source),
        "--elements",
        path_str(&elements),
        "--out",
        path_str(&out),
    ]));
    assert!(result.is_err());
    assert!(!out.exists());
}

#[test]
fn test_export_rejects_bad_zoom_and_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let source = dir.path().join("in.pdf");
    let elements = dir.path().join("elements.json");
    let out = dir.path().join("out.pdf");
    write_pdf(&source, 1);
    std::fs::write(&elements, "{ not json").expect("write snapshot");

    let args = |zoom: &'static str| {
        cli(&[
            "export",
            "--source",
            path_str(&source),
            "--elements",
            path_str(&elements),
            "--out",
            path_str(&out),
            "--zoom",
            zoom,
        ])
    };
    assert!(run(args("0")).is_err());
    assert!(run(args("1.5")).is_err());
    assert!(!out.exists());
}
