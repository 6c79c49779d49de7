//! # PDF Overlay Renderer
//!
//! Bakes committed overlay elements into a copy of the source PDF.
//!
//! ## Export Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            ExportPipeline                   │
//! ├──────────────────────┬──────────────────────┤
//! │ TextRasterizer       │ AuthoringService     │
//! │ (ab_glyph +          │ (lopdf: XObjects,    │
//! │  tiny-skia → PNG)    │  content streams)    │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! Text is never written as PDF text; every text element is embedded as a
//! transparent PNG at its element box.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod authoring;
pub mod error;
pub mod export;
pub mod font;
pub mod image;
pub mod pdf;
pub mod text;

pub use authoring::{AuthoringService, ImageRef};
pub use error::{RenderError, RenderResult};
pub use export::{ExportConfig, ExportPipeline};
pub use font::FontBook;
pub use pdf::{LopdfAuthoring, PdfDocument};
pub use text::{GlyphRasterizer, TextLayout, TextRaster, TextRasterizer};

/// Overlay renderer version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
