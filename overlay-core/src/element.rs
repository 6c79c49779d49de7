//! Overlay elements - the text and image marks placed on a page.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Minimum element width in overlay pixels.
pub const MIN_WIDTH: f32 = 50.0;

/// Minimum element height in overlay pixels.
pub const MIN_HEIGHT: f32 = 30.0;

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in overlay space (pixels, origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another point.
    #[must_use]
    pub fn manhattan(self, other: Self) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Multiply both dimensions by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

/// Position and size of an element box in overlay space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Bounds {
    /// Create a new box.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a normalized box spanning two corner points.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Top-left corner.
    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Width and height.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// X coordinate of the right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Y coordinate of the bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Check if a point is within this box (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Return this box with width and height raised to the minimum floor.
    #[must_use]
    pub fn with_min_size(mut self) -> Self {
        self.width = self.width.max(MIN_WIDTH);
        self.height = self.height.max(MIN_HEIGHT);
        self
    }
}

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Black.
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    /// Create a new color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (the `#` is optional). Returns `None` for anything else.
    #[must_use]
    pub fn parse_hex(input: &str) -> Option<Self> {
        let hex = input.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Format as `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<String> for Rgb {
    fn from(value: String) -> Self {
        Self::parse_hex(&value).unwrap_or(Self::BLACK)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

/// Font and color used to draw a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Text color.
    pub color: Rgb,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            font_size: 16.0,
            color: Rgb::BLACK,
        }
    }
}

/// Supported image payload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
}

impl ImageFormat {
    /// Detect the format from the payload's magic bytes.
    #[must_use]
    pub fn sniff(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(Self::Png);
        }
        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        None
    }

    /// Detect the format, failing for anything but PNG or JPEG.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedImageFormat`] for other payloads.
    pub fn detect(data: &[u8]) -> CoreResult<Self> {
        Self::sniff(data).ok_or_else(|| {
            let head: Vec<String> = data.iter().take(4).map(|b| format!("{b:02x}")).collect();
            CoreError::UnsupportedImageFormat(format!("unrecognized header [{}]", head.join(" ")))
        })
    }

    /// MIME type of the format.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// The content an element carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ElementKind {
    /// A block of (possibly multi-line) text.
    Text {
        /// Text content; line breaks are significant.
        content: String,
        /// Font and color.
        style: TextStyle,
    },

    /// An encoded PNG or JPEG image.
    Image {
        /// Raw encoded payload.
        #[serde(with = "base64_payload")]
        data: Vec<u8>,
        /// Intrinsic width at insertion time.
        intrinsic_width: f32,
        /// Intrinsic height at insertion time.
        intrinsic_height: f32,
    },
}

/// A positioned element on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Owning page number (1-based).
    pub page: u32,
    /// Position and size in overlay space.
    pub bounds: Bounds,
    /// Element content.
    pub kind: ElementKind,
}

impl Element {
    /// Create a text element. The box is raised to the minimum size.
    #[must_use]
    pub fn text(page: u32, bounds: Bounds, content: impl Into<String>, style: TextStyle) -> Self {
        Self {
            id: ElementId::new(),
            page,
            bounds: bounds.with_min_size(),
            kind: ElementKind::Text {
                content: content.into(),
                style,
            },
        }
    }

    /// Create an image element sized to its intrinsic dimensions (floored to the minimum size).
    #[must_use]
    pub fn image(page: u32, origin: Point, data: Vec<u8>, width: f32, height: f32) -> Self {
        Self {
            id: ElementId::new(),
            page,
            bounds: Bounds::new(origin.x, origin.y, width, height).with_min_size(),
            kind: ElementKind::Image {
                data,
                intrinsic_width: width,
                intrinsic_height: height,
            },
        }
    }

    /// Whether the element offers resize handles.
    #[must_use]
    pub fn is_resizable(&self) -> bool {
        matches!(self.kind, ElementKind::Text { .. })
    }

    /// Text content, if this is a text element.
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text { content, .. } => Some(content),
            ElementKind::Image { .. } => None,
        }
    }

    /// Text style, if this is a text element.
    #[must_use]
    pub fn text_style(&self) -> Option<&TextStyle> {
        match &self.kind {
            ElementKind::Text { style, .. } => Some(style),
            ElementKind::Image { .. } => None,
        }
    }

    /// Check if a point (in overlay coordinates) is within this element.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        self.bounds.contains(point)
    }

    /// Apply a patch. Validation happens before anything is written, so a
    /// rejected patch leaves the element untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] when the patch does not fit the
    /// element kind or carries an invalid font size.
    pub fn apply(&mut self, patch: &ElementPatch) -> CoreResult<()> {
        if let Some(size) = patch.font_size {
            if !(size.is_finite() && size > 0.0) {
                return Err(CoreError::InvalidOperation(format!(
                    "font size must be positive, got {size}"
                )));
            }
        }

        match &mut self.kind {
            ElementKind::Text { content, style } => {
                if let Some(new_content) = &patch.content {
                    content.clone_from(new_content);
                }
                if let Some(family) = &patch.font_family {
                    style.font_family.clone_from(family);
                }
                if let Some(size) = patch.font_size {
                    style.font_size = size;
                }
                if let Some(color) = patch.color {
                    style.color = color;
                }
            }
            ElementKind::Image { .. } => {
                if patch.touches_text() {
                    return Err(CoreError::InvalidOperation(format!(
                        "text properties cannot be set on image element {}",
                        self.id
                    )));
                }
                if patch.width.is_some() || patch.height.is_some() {
                    return Err(CoreError::InvalidOperation(format!(
                        "image element {} is not resizable",
                        self.id
                    )));
                }
            }
        }

        if let Some(x) = patch.x {
            self.bounds.x = x;
        }
        if let Some(y) = patch.y {
            self.bounds.y = y;
        }
        if let Some(width) = patch.width {
            self.bounds.width = width;
        }
        if let Some(height) = patch.height {
            self.bounds.height = height;
        }
        self.bounds = self.bounds.with_min_size();
        Ok(())
    }
}

/// A partial update for an element. `id` and `page` are never patchable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    /// New x position.
    pub x: Option<f32>,
    /// New y position.
    pub y: Option<f32>,
    /// New width.
    pub width: Option<f32>,
    /// New height.
    pub height: Option<f32>,
    /// New text content.
    pub content: Option<String>,
    /// New font family.
    pub font_family: Option<String>,
    /// New font size.
    pub font_size: Option<f32>,
    /// New text color.
    pub color: Option<Rgb>,
}

impl ElementPatch {
    /// Patch that moves the element.
    #[must_use]
    pub fn position(origin: Point) -> Self {
        Self {
            x: Some(origin.x),
            y: Some(origin.y),
            ..Self::default()
        }
    }

    /// Patch that replaces position and size.
    #[must_use]
    pub fn bounds(bounds: Bounds) -> Self {
        Self {
            x: Some(bounds.x),
            y: Some(bounds.y),
            width: Some(bounds.width),
            height: Some(bounds.height),
            ..Self::default()
        }
    }

    /// Set the text content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the height.
    #[must_use]
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    fn touches_text(&self) -> bool {
        self.content.is_some()
            || self.font_family.is_some()
            || self.font_size.is_some()
            || self.color.is_some()
    }
}

/// Serde adapter storing image payloads as base64 strings.
mod base64_payload {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_parsing() {
        assert_eq!(Rgb::parse_hex("#ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::parse_hex("00FF00"), Some(Rgb::new(0, 255, 0)));
        assert_eq!(Rgb::parse_hex("#fff"), None);
        assert_eq!(Rgb::from("not a color".to_string()), Rgb::BLACK);
        assert_eq!(Rgb::new(1, 2, 255).to_hex(), "#0102ff");
    }

    #[test]
    fn test_creation_applies_minimum_size() {
        let element =
            Element::text(1, Bounds::new(5.0, 5.0, 10.0, 10.0), "x", TextStyle::default());
        assert!((element.bounds.width - MIN_WIDTH).abs() < f32::EPSILON);
        assert!((element.bounds.height - MIN_HEIGHT).abs() < f32::EPSILON);
    }

    #[test]
    fn test_image_keeps_intrinsic_size() {
        let element = Element::image(2, Point::new(0.0, 0.0), vec![1, 2, 3], 20.0, 120.0);
        assert!((element.bounds.width - MIN_WIDTH).abs() < f32::EPSILON);
        match element.kind {
            ElementKind::Image {
                intrinsic_width,
                intrinsic_height,
                ..
            } => {
                assert!((intrinsic_width - 20.0).abs() < f32::EPSILON);
                assert!((intrinsic_height - 120.0).abs() < f32::EPSILON);
            }
            ElementKind::Text { .. } => panic!("expected image"),
        }
    }

    #[test]
    fn test_patch_rejected_on_image_leaves_element_untouched() {
        let mut element = Element::image(1, Point::new(10.0, 10.0), vec![], 100.0, 80.0);
        let before = element.clone();
        let patch = ElementPatch::position(Point::new(50.0, 50.0)).with_content("nope");
        assert!(element.apply(&patch).is_err());
        assert_eq!(element, before);

        let resize = ElementPatch::bounds(Bounds::new(0.0, 0.0, 300.0, 300.0));
        assert!(matches!(
            element.apply(&resize),
            Err(CoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_patch_text_fields() {
        let mut element =
            Element::text(1, Bounds::new(0.0, 0.0, 100.0, 40.0), "a", TextStyle::default());
        let patch = ElementPatch {
            font_size: Some(24.0),
            color: Some(Rgb::new(255, 0, 0)),
            width: Some(10.0),
            ..ElementPatch::default()
        }
        .with_content("b");
        element.apply(&patch).expect("patch applies");
        assert_eq!(element.text_content(), Some("b"));
        let style = element.text_style().expect("text style");
        assert!((style.font_size - 24.0).abs() < f32::EPSILON);
        assert_eq!(style.color, Rgb::new(255, 0, 0));
        assert!((element.bounds.width - MIN_WIDTH).abs() < f32::EPSILON);
    }

    #[test]
    fn test_format_sniffing() {
        assert_eq!(ImageFormat::sniff(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert!(matches!(
            ImageFormat::detect(b"GIF89a"),
            Err(CoreError::UnsupportedImageFormat(_))
        ));
    }

    #[test]
    fn test_image_payload_serializes_as_base64() {
        let element = Element::image(1, Point::new(0.0, 0.0), vec![0xFF, 0xD8, 0xFF], 60.0, 40.0);
        let json = serde_json::to_string(&element).expect("serialize");
        assert!(json.contains("\"/9j/\""));
        let back: Element = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, element);
    }
}
