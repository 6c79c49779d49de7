//! Offline text rasterization.
//!
//! Text elements are exported as transparent PNG rasters rather than PDF
//! text. Lines are split on explicit breaks only; the raster is at least as
//! large as the element box and grows to fit longer lines or more lines.

use ab_glyph::{point, Font, PxScale, ScaleFont};
use overlay_core::{measure::TextMeasure, Size, TextStyle};
use tiny_skia::{Pixmap, PremultipliedColorU8};

use crate::{
    error::{RenderError, RenderResult},
    font::FontBook,
};

/// Measured layout of a text element.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Lines split on explicit breaks.
    pub lines: Vec<String>,
    /// Distance between line tops.
    pub line_height: f32,
    /// Width of the widest line.
    pub max_line_width: f32,
    /// Logical raster size (before supersampling).
    pub size: Size,
}

impl TextLayout {
    /// Lay out `content` for an element box of `box_size`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(
        content: &str,
        style: &TextStyle,
        box_size: Size,
        line_height_factor: f32,
        measure: &dyn TextMeasure,
    ) -> Self {
        let lines: Vec<String> = content.split('\n').map(str::to_string).collect();
        let line_height = line_height_factor * style.font_size;
        let max_line_width = lines
            .iter()
            .map(|line| measure.line_width(line, style))
            .fold(0.0_f32, f32::max);
        let size = Size::new(
            max_line_width.max(box_size.width),
            (lines.len() as f32 * line_height).max(box_size.height),
        );
        Self {
            lines,
            line_height,
            max_line_width,
            size,
        }
    }

    /// Top of line `index`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn line_top(&self, index: usize) -> f32 {
        index as f32 * self.line_height
    }
}

/// An encoded text raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRaster {
    /// PNG bytes.
    pub png: Vec<u8>,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

/// Turns a text element into a transparent PNG.
pub trait TextRasterizer {
    /// Rasterize `content` for an element box of `box_size`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be drawn or encoded.
    fn rasterize(&self, content: &str, style: &TextStyle, box_size: Size)
        -> RenderResult<TextRaster>;
}

/// Glyph-outline rasterizer backed by a [`FontBook`] and tiny-skia.
#[derive(Debug)]
pub struct GlyphRasterizer {
    fonts: FontBook,
    supersample: f32,
    line_height_factor: f32,
}

impl GlyphRasterizer {
    /// Create a rasterizer drawing at `supersample` times the logical size.
    #[must_use]
    pub fn new(fonts: FontBook, supersample: f32, line_height_factor: f32) -> Self {
        Self {
            fonts,
            supersample: supersample.max(1.0),
            line_height_factor,
        }
    }
}

impl TextRasterizer for GlyphRasterizer {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    fn rasterize(
        &self,
        content: &str,
        style: &TextStyle,
        box_size: Size,
    ) -> RenderResult<TextRaster> {
        let layout = TextLayout::new(
            content,
            style,
            box_size,
            self.line_height_factor,
            &self.fonts,
        );
        let ss = self.supersample;
        let width = ((layout.size.width * ss).ceil() as u32).max(1);
        let height = ((layout.size.height * ss).ceil() as u32).max(1);
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            RenderError::Export(format!("cannot allocate {width}x{height} text raster"))
        })?;

        let has_glyphs = content.chars().any(|c| !c.is_whitespace());
        if has_glyphs {
            let font = self.fonts.font(&style.font_family).ok_or_else(|| {
                RenderError::Font(format!("no font available for '{}'", style.font_family))
            })?;
            let scale = PxScale::from(style.font_size * ss);
            let scaled = font.as_scaled(scale);

            // Max coverage per pixel, not additive.
            let mut coverage = vec![0.0_f32; (width * height) as usize];
            for (index, line) in layout.lines.iter().enumerate() {
                let baseline = layout.line_top(index) * ss + scaled.ascent();
                let mut x = 0.0;
                let mut previous = None;
                for ch in line.chars() {
                    let glyph_id = scaled.glyph_id(ch);
                    if let Some(prev) = previous {
                        x += scaled.kern(prev, glyph_id);
                    }
                    let glyph = glyph_id.with_scale_and_position(scale, point(x, baseline));
                    if let Some(outlined) = scaled.outline_glyph(glyph) {
                        let bounds = outlined.px_bounds();
                        outlined.draw(|gx, gy, c| {
                            let px = bounds.min.x as i32 + gx as i32;
                            let py = bounds.min.y as i32 + gy as i32;
                            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                                let slot = &mut coverage[(py as u32 * width + px as u32) as usize];
                                *slot = slot.max(c.clamp(0.0, 1.0));
                            }
                        });
                    }
                    x += scaled.h_advance(glyph_id);
                    previous = Some(glyph_id);
                }
            }

            let color = style.color;
            for (pixel, c) in pixmap.pixels_mut().iter_mut().zip(coverage) {
                if c <= 0.0 {
                    continue;
                }
                let channel = |v: u8| (f32::from(v) * c).round() as u8;
                let alpha = (255.0 * c).round() as u8;
                if let Some(premultiplied) = PremultipliedColorU8::from_rgba(
                    channel(color.r).min(alpha),
                    channel(color.g).min(alpha),
                    channel(color.b).min(alpha),
                    alpha,
                ) {
                    *pixel = premultiplied;
                }
            }
        }

        let png = pixmap
            .encode_png()
            .map_err(|e| RenderError::export("PNG encoding failed", e))?;
        Ok(TextRaster { png, width, height })
    }
}
