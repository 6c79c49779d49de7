//! Font loading and glyph metrics.

use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use overlay_core::{measure::TextMeasure, FixedAdvance, TextStyle};

use crate::error::{RenderError, RenderResult};

/// Fonts keyed by family name.
///
/// Lookups are case-insensitive. A family that was never loaded falls back to
/// the first font added, so every element renders as long as one font exists.
#[derive(Default)]
pub struct FontBook {
    fonts: HashMap<String, FontVec>,
    fallback: Option<String>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<&String> = self.fonts.keys().collect();
        families.sort();
        f.debug_struct("FontBook")
            .field("families", &families)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl FontBook {
    /// Create an empty font book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a TrueType/OpenType font under `family`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Font`] if the data is not a parsable font.
    pub fn add(&mut self, family: &str, data: Vec<u8>) -> RenderResult<()> {
        let font = FontVec::try_from_vec(data)
            .map_err(|e| RenderError::Font(format!("{family}: {e}")))?;
        let key = family.to_lowercase();
        if self.fallback.is_none() {
            self.fallback = Some(key.clone());
        }
        tracing::debug!(family, "font registered");
        self.fonts.insert(key, font);
        Ok(())
    }

    /// Load a font file, registering it under its file stem.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Font`] if the file cannot be read or parsed.
    pub fn load_file(&mut self, path: &Path) -> RenderResult<String> {
        let family = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| RenderError::Font(format!("invalid font path {}", path.display())))?
            .to_string();
        let data = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {e}", path.display())))?;
        self.add(&family, data)?;
        Ok(family)
    }

    /// Font for `family`, or the fallback font.
    #[must_use]
    pub fn font(&self, family: &str) -> Option<&FontVec> {
        self.fonts.get(&family.to_lowercase()).or_else(|| {
            self.fallback
                .as_ref()
                .and_then(|fallback| self.fonts.get(fallback))
        })
    }

    /// Whether no font has been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// Width of a line set in `font` at `size` pixels, kerning included.
#[must_use]
pub fn line_width(font: &FontVec, size: f32, line: &str) -> f32 {
    let scaled = font.as_scaled(PxScale::from(size));
    let mut width = 0.0;
    let mut previous = None;
    for ch in line.chars() {
        let glyph_id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled.kern(prev, glyph_id);
        }
        width += scaled.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
    width
}

impl TextMeasure for FontBook {
    fn line_width(&self, line: &str, style: &TextStyle) -> f32 {
        match self.font(&style.font_family) {
            Some(font) => line_width(font, style.font_size, line),
            None => FixedAdvance::default().line_width(line, style),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_book_measures_with_fixed_advance() {
        let book = FontBook::new();
        assert!(book.is_empty());
        assert!(book.font("Helvetica").is_none());
        let style = TextStyle::default();
        let width = book.line_width("abcd", &style);
        assert!((width - 4.0 * 16.0 * 0.6).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_font_data_rejected() {
        let mut book = FontBook::new();
        assert!(matches!(
            book.add("Broken", vec![0, 1, 2, 3]),
            Err(RenderError::Font(_))
        ));
        assert!(book.is_empty());
    }

    #[test]
    fn test_missing_font_file() {
        let mut book = FontBook::new();
        assert!(book
            .load_file(Path::new("/nonexistent/NoSuchFont.ttf"))
            .is_err());
    }
}
