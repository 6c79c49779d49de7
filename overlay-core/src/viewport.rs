//! Zoom and page navigation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{transform::PageMapping, Bounds, CoreError, CoreResult, Point, Size};

/// Zoom limits and fit behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Scale used when a document is opened. Element geometry is stored at
    /// this scale regardless of the current zoom.
    pub default_scale: f32,
    /// Smallest allowed scale.
    pub min_scale: f32,
    /// Largest allowed scale.
    pub max_scale: f32,
    /// Scale change per zoom-in/zoom-out step.
    pub zoom_step: f32,
    /// Margin subtracted from the container before fitting, in pixels.
    pub fit_margin: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            default_scale: 1.5,
            min_scale: 0.5,
            max_scale: 3.0,
            zoom_step: 0.25,
            fit_margin: 40.0,
        }
    }
}

impl ViewportConfig {
    /// Clamp `scale` into the allowed range.
    #[must_use]
    pub fn clamp(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

/// Current page and zoom over a document's native page sizes.
#[derive(Debug, Clone)]
pub struct Viewport {
    config: ViewportConfig,
    /// Native page sizes in points, index 0 is page 1.
    page_sizes: Vec<Size>,
    current_page: u32,
    scale: f32,
}

impl Viewport {
    /// Create a viewport on page 1 at the default scale.
    #[must_use]
    pub fn new(page_sizes: Vec<Size>, config: ViewportConfig) -> Self {
        Self {
            scale: config.clamp(config.default_scale),
            config,
            page_sizes,
            current_page: 1,
        }
    }

    /// Zoom configuration.
    #[must_use]
    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.page_sizes.len()).unwrap_or(u32::MAX)
    }

    /// Current page (1-based).
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Current zoom scale.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Set the scale (clamped) and return the value actually used.
    pub fn set_scale(&mut self, scale: f32) -> f32 {
        if scale.is_finite() {
            self.scale = self.config.clamp(scale);
        }
        self.scale
    }

    /// Increase the scale by one step.
    pub fn zoom_in(&mut self) -> f32 {
        self.set_scale(self.scale + self.config.zoom_step)
    }

    /// Decrease the scale by one step.
    pub fn zoom_out(&mut self) -> f32 {
        self.set_scale(self.scale - self.config.zoom_step)
    }

    /// Scale the current page so its width fills `container_width` minus the margin.
    pub fn fit_width(&mut self, container_width: f32) -> f32 {
        let native = self.native_size(self.current_page).unwrap_or_default();
        if native.width <= 0.0 {
            return self.scale;
        }
        self.set_scale((container_width - self.config.fit_margin) / native.width)
    }

    /// Scale the current page so it fits entirely inside the container.
    pub fn fit_page(&mut self, container_width: f32, container_height: f32) -> f32 {
        let native = self.native_size(self.current_page).unwrap_or_default();
        if native.width <= 0.0 || native.height <= 0.0 {
            return self.scale;
        }
        let width_ratio = (container_width - self.config.fit_margin) / native.width;
        let height_ratio = (container_height - self.config.fit_margin) / native.height;
        self.set_scale(width_ratio.min(height_ratio))
    }

    /// Move to the next page. Returns `false` on the last page.
    pub fn next_page(&mut self) -> bool {
        if self.current_page < self.page_count() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous page. Returns `false` on the first page.
    pub fn previous_page(&mut self) -> bool {
        if self.current_page > 1 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to a page.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if `page` is outside `1..=page_count`.
    pub fn go_to(&mut self, page: u32) -> CoreResult<()> {
        if page == 0 || page > self.page_count() {
            return Err(CoreError::InvalidOperation(format!(
                "page {page} is out of range 1..={}",
                self.page_count()
            )));
        }
        self.current_page = page;
        Ok(())
    }

    /// Native size of a page in points.
    #[must_use]
    pub fn native_size(&self, page: u32) -> Option<Size> {
        let index = usize::try_from(page.checked_sub(1)?).ok()?;
        self.page_sizes.get(index).copied()
    }

    /// Size of the current page's overlay at the current scale.
    #[must_use]
    pub fn overlay_size(&self) -> Size {
        self.native_size(self.current_page)
            .unwrap_or_default()
            .scaled(self.scale)
    }

    /// Scale at which element geometry is stored: the configured default.
    #[must_use]
    pub fn reference_scale(&self) -> f32 {
        self.config.clamp(self.config.default_scale)
    }

    /// View pixels per element-space pixel at the current zoom.
    #[must_use]
    pub fn view_factor(&self) -> f32 {
        self.scale / self.reference_scale()
    }

    /// Size of the current page in element space.
    #[must_use]
    pub fn reference_size(&self) -> Size {
        self.native_size(self.current_page)
            .unwrap_or_default()
            .scaled(self.reference_scale())
    }

    /// Map a point in view pixels to element space.
    #[must_use]
    pub fn to_element_space(&self, point: Point) -> Point {
        let factor = self.view_factor();
        Point::new(point.x / factor, point.y / factor)
    }

    /// Map element-space bounds to view pixels.
    #[must_use]
    pub fn to_view(&self, bounds: &Bounds) -> Bounds {
        let factor = self.view_factor();
        Bounds::new(
            bounds.x * factor,
            bounds.y * factor,
            bounds.width * factor,
            bounds.height * factor,
        )
    }

    /// Export/element-space size pair of a page. Independent of zoom.
    #[must_use]
    pub fn page_mapping(&self, page: u32) -> Option<PageMapping> {
        self.native_size(page)
            .map(|native| PageMapping::new(native, native.scaled(self.reference_scale())))
    }

    /// Mappings for every page, keyed by page number.
    #[must_use]
    pub fn page_dimensions(&self) -> BTreeMap<u32, PageMapping> {
        (1..=self.page_count())
            .filter_map(|page| self.page_mapping(page).map(|m| (page, m)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter(pages: usize) -> Viewport {
        Viewport::new(vec![Size::new(612.0, 792.0); pages], ViewportConfig::default())
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let mut viewport = letter(1);
        assert!((viewport.scale() - 1.5).abs() < f32::EPSILON);
        assert!((viewport.zoom_in() - 1.75).abs() < f32::EPSILON);
        for _ in 0..20 {
            viewport.zoom_in();
        }
        assert!((viewport.scale() - 3.0).abs() < f32::EPSILON);
        for _ in 0..20 {
            viewport.zoom_out();
        }
        assert!((viewport.scale() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fit_width_and_page() {
        let mut viewport = letter(1);
        let scale = viewport.fit_width(652.0);
        assert!((scale - 1.0).abs() < 1e-6);

        // Height is the tighter constraint here.
        let scale = viewport.fit_page(1264.0, 832.0);
        assert!((scale - 1.0).abs() < 1e-6);

        // Tiny containers are clamped to the minimum.
        assert!((viewport.fit_width(100.0) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_navigation_bounds() {
        let mut viewport = letter(3);
        assert!(!viewport.previous_page());
        assert!(viewport.next_page());
        assert!(viewport.next_page());
        assert!(!viewport.next_page());
        assert_eq!(viewport.current_page(), 3);
        assert!(viewport.go_to(0).is_err());
        assert!(viewport.go_to(4).is_err());
        viewport.go_to(1).expect("page 1");
        assert_eq!(viewport.current_page(), 1);
    }

    #[test]
    fn test_page_mapping_ignores_zoom() {
        let mut viewport = letter(2);
        viewport.set_scale(0.5);
        let mapping = viewport.page_mapping(2).expect("mapping");
        assert_eq!(mapping.overlay, Size::new(918.0, 1188.0));
        assert!((mapping.scale() - 792.0 / 1188.0).abs() < 1e-6);
        assert_eq!(viewport.page_dimensions().len(), 2);
        assert!(viewport.page_mapping(3).is_none());
        assert_eq!(viewport.overlay_size(), Size::new(306.0, 396.0));
        assert_eq!(viewport.reference_size(), Size::new(918.0, 1188.0));
    }

    #[test]
    fn test_view_conversion() {
        let mut viewport = letter(1);
        assert!((viewport.view_factor() - 1.0).abs() < f32::EPSILON);
        viewport.set_scale(3.0);
        assert_eq!(
            viewport.to_element_space(Point::new(300.0, 600.0)),
            Point::new(150.0, 300.0)
        );
        assert_eq!(
            viewport.to_view(&Bounds::new(150.0, 300.0, 200.0, 40.0)),
            Bounds::new(300.0, 600.0, 400.0, 80.0)
        );
    }
}
