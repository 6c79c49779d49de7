//! Resize handles around a selected element.

use serde::{Deserialize, Serialize};

use crate::{Bounds, Point};

/// Side length of a square resize handle, in overlay pixels.
pub const HANDLE_SIZE: f32 = 10.0;

/// One of the eight directional resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    /// Top edge midpoint.
    N,
    /// Bottom edge midpoint.
    S,
    /// Right edge midpoint.
    E,
    /// Left edge midpoint.
    W,
    /// Top-right corner.
    NE,
    /// Top-left corner.
    NW,
    /// Bottom-right corner.
    SE,
    /// Bottom-left corner.
    SW,
}

impl ResizeHandle {
    /// All handles, corners first.
    ///
    /// Corners are tested before edges so that on very small boxes, where
    /// handles overlap, the corner wins.
    pub const ALL: [Self; 8] = [
        Self::NW,
        Self::NE,
        Self::SE,
        Self::SW,
        Self::N,
        Self::E,
        Self::S,
        Self::W,
    ];

    /// Whether dragging this handle moves the right edge.
    #[must_use]
    pub fn has_east(self) -> bool {
        matches!(self, Self::E | Self::NE | Self::SE)
    }

    /// Whether dragging this handle moves the left edge (and the x anchor).
    #[must_use]
    pub fn has_west(self) -> bool {
        matches!(self, Self::W | Self::NW | Self::SW)
    }

    /// Whether dragging this handle moves the top edge (and the y anchor).
    #[must_use]
    pub fn has_north(self) -> bool {
        matches!(self, Self::N | Self::NE | Self::NW)
    }

    /// Whether dragging this handle moves the bottom edge.
    #[must_use]
    pub fn has_south(self) -> bool {
        matches!(self, Self::S | Self::SE | Self::SW)
    }

    /// Center of this handle on `bounds`.
    #[must_use]
    pub fn anchor(self, bounds: &Bounds) -> Point {
        let x = if self.has_west() {
            bounds.x
        } else if self.has_east() {
            bounds.right()
        } else {
            bounds.x + bounds.width / 2.0
        };
        let y = if self.has_north() {
            bounds.y
        } else if self.has_south() {
            bounds.bottom()
        } else {
            bounds.y + bounds.height / 2.0
        };
        Point::new(x, y)
    }

    /// Square hit area of this handle on `bounds`.
    #[must_use]
    pub fn hit_area(self, bounds: &Bounds) -> Bounds {
        let center = self.anchor(bounds);
        let half = HANDLE_SIZE / 2.0;
        Bounds::new(center.x - half, center.y - half, HANDLE_SIZE, HANDLE_SIZE)
    }

    /// Find the handle of `bounds` under `point`, if any.
    #[must_use]
    pub fn hit_test(bounds: &Bounds, point: Point) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|handle| handle.hit_area(bounds).contains(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_membership() {
        assert!(ResizeHandle::NE.has_east() && ResizeHandle::NE.has_north());
        assert!(!ResizeHandle::NE.has_west() && !ResizeHandle::NE.has_south());
        assert!(ResizeHandle::W.has_west());
        assert!(!ResizeHandle::W.has_north() && !ResizeHandle::W.has_south());
        assert!(ResizeHandle::SW.has_south() && ResizeHandle::SW.has_west());
    }

    #[test]
    fn test_anchor_positions() {
        let bounds = Bounds::new(10.0, 20.0, 100.0, 60.0);
        assert_eq!(ResizeHandle::NW.anchor(&bounds), Point::new(10.0, 20.0));
        assert_eq!(ResizeHandle::SE.anchor(&bounds), Point::new(110.0, 80.0));
        assert_eq!(ResizeHandle::N.anchor(&bounds), Point::new(60.0, 20.0));
        assert_eq!(ResizeHandle::W.anchor(&bounds), Point::new(10.0, 50.0));
    }

    #[test]
    fn test_hit_test() {
        let bounds = Bounds::new(10.0, 20.0, 100.0, 60.0);
        assert_eq!(
            ResizeHandle::hit_test(&bounds, Point::new(113.0, 83.0)),
            Some(ResizeHandle::SE)
        );
        assert_eq!(
            ResizeHandle::hit_test(&bounds, Point::new(8.0, 50.0)),
            Some(ResizeHandle::W)
        );
        assert_eq!(ResizeHandle::hit_test(&bounds, Point::new(60.0, 50.0)), None);
    }
}
