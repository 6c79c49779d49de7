//! Mapping between overlay space and export space.
//!
//! ```text
//!   overlay space (zoomed pixels)          export space (page points)
//!   (0,0) ───────────► x                   y ▲
//!     │   ┌──────┐                           │   ┌──────┐  ← (X, Y + EH)
//!     │   │ elem │                           │   │ elem │
//!     ▼   └──────┘                           │   └──────┘  ← (X, Y)
//!     y                                  (0,0) ───────────► x
//! ```
//!
//! Overlay boxes are anchored at their top-left corner while export
//! placements are anchored at their bottom-left corner, so the full scaled
//! element height is subtracted when flipping the y axis.

use serde::{Deserialize, Serialize};

use crate::{Bounds, Point, Size};

/// Export-space and overlay-space sizes of the same page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMapping {
    /// Page size in export points.
    pub export: Size,
    /// Page size in overlay pixels at the zoom the elements were placed with.
    pub overlay: Size,
}

impl PageMapping {
    /// Create a mapping from the two page sizes.
    #[must_use]
    pub const fn new(export: Size, overlay: Size) -> Self {
        Self { export, overlay }
    }

    /// Export units per overlay pixel.
    #[must_use]
    pub fn scale(&self) -> f32 {
        scale_factor(self.export.height, self.overlay.height)
    }

    /// Whether both sizes are finite and strictly positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [
            self.export.width,
            self.export.height,
            self.overlay.width,
            self.overlay.height,
        ]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// A point in export space (points, origin bottom-left, y up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportPoint {
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
}

/// A placement box in export space, anchored at its bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportRect {
    /// X of the bottom-left corner.
    pub x: f32,
    /// Y of the bottom-left corner.
    pub y: f32,
    /// Width in points.
    pub width: f32,
    /// Height in points.
    pub height: f32,
}

/// `export_height / overlay_height`.
#[must_use]
pub fn scale_factor(export_height: f32, overlay_height: f32) -> f32 {
    export_height / overlay_height
}

/// Map the top-left corner of an overlay box of height `element_height` to
/// the bottom-left corner of its export placement.
#[must_use]
pub fn to_export(origin: Point, element_height: f32, mapping: &PageMapping) -> ExportPoint {
    let scale = mapping.scale();
    ExportPoint {
        x: origin.x * scale,
        y: mapping.export.height - (origin.y * scale) - (element_height * scale),
    }
}

/// Inverse of [`to_export`]: recover the overlay top-left corner of a box
/// whose export placement starts at `point`.
#[must_use]
pub fn to_overlay(point: ExportPoint, element_height: f32, mapping: &PageMapping) -> Point {
    let scale = mapping.scale();
    Point::new(
        point.x / scale,
        (mapping.export.height - point.y - element_height * scale) / scale,
    )
}

/// Map a whole overlay box to its export placement.
#[must_use]
pub fn map_bounds(bounds: &Bounds, mapping: &PageMapping) -> ExportRect {
    let scale = mapping.scale();
    let origin = to_export(bounds.origin(), bounds.height, mapping);
    ExportRect {
        x: origin.x,
        y: origin.y,
        width: bounds.width * scale,
        height: bounds.height * scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_at_150_percent() -> PageMapping {
        PageMapping::new(Size::new(612.0, 792.0), Size::new(918.0, 1188.0))
    }

    #[test]
    fn test_text_element_maps_to_expected_point() {
        let mapping = letter_at_150_percent();
        let point = to_export(Point::new(150.0, 300.0), 18.0, &mapping);
        assert!((point.x - 100.0).abs() < 1e-3, "x = {}", point.x);
        assert!((point.y - 580.0).abs() < 1e-3, "y = {}", point.y);
    }

    #[test]
    fn test_full_height_is_subtracted() {
        let mapping = PageMapping::new(Size::new(100.0, 100.0), Size::new(100.0, 100.0));
        let point = to_export(Point::new(0.0, 0.0), 40.0, &mapping);
        assert!((point.y - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_inverse_recovers_origin() {
        let mapping = letter_at_150_percent();
        let origin = Point::new(37.5, 411.0);
        let back = to_overlay(to_export(origin, 64.0, &mapping), 64.0, &mapping);
        assert!((back.x - origin.x).abs() < 1e-3);
        assert!((back.y - origin.y).abs() < 1e-3);
    }

    #[test]
    fn test_map_bounds_scales_size() {
        let mapping = letter_at_150_percent();
        let rect = map_bounds(&Bounds::new(0.0, 0.0, 300.0, 150.0), &mapping);
        assert!((rect.width - 200.0).abs() < 1e-3);
        assert!((rect.height - 100.0).abs() < 1e-3);
        assert!((rect.y - 692.0).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_mapping_detected() {
        let mapping = PageMapping::new(Size::new(612.0, 792.0), Size::new(0.0, 0.0));
        assert!(!mapping.is_valid());
        assert!(letter_at_150_percent().is_valid());
    }
}
