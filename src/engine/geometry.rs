//! Page-space rectangles
//!
//! All boxes live in PDF page space: origin at the bottom-left corner of the
//! visible page box as displayed, x to the right, y upward, units in points.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// A box is usable only when it has positive width and height.
    pub fn is_valid(&self) -> bool {
        self.x1 > self.x0 && self.y1 > self.y0
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Grow outward by `amount` on every side.
    pub fn expand(&self, amount: f32) -> Self {
        Self {
            x0: self.x0 - amount,
            y0: self.y0 - amount,
            x1: self.x1 + amount,
            y1: self.y1 + amount,
        }
    }

    /// Shrink inward by `amount` on every side. The result may be degenerate.
    pub fn shrink(&self, amount: f32) -> Self {
        self.expand(-amount)
    }

    /// Inclusive point containment
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.x0 <= x && x <= self.x1 && self.y0 <= y && y <= self.y1
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Union of an iterator of boxes, `None` when empty.
    pub fn union_all<'a, I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BoundingBox>, b| {
                Some(acc.map_or(*b, |a| a.union(b)))
            })
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Orientation of a page as displayed.
///
/// Text maps and overlay entries use the displayed page: the visible box
/// turned clockwise by `rotation`, origin at its bottom-left corner. User
/// space is the same box before rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpace {
    /// Clockwise quarter turns in degrees: 0, 90, 180 or 270
    pub rotation: u16,
    /// Unrotated box width
    pub width: f32,
    /// Unrotated box height
    pub height: f32,
}

impl PageSpace {
    pub fn new(rotation: i64, width: f32, height: f32) -> Self {
        Self {
            rotation: normalize_rotation(rotation),
            width,
            height,
        }
    }

    /// Same page seen with a different rotation.
    pub fn rotated(&self, rotation: u16) -> Self {
        Self {
            rotation: normalize_rotation(rotation as i64),
            ..*self
        }
    }

    /// Coefficients `[a b c d e f]` mapping displayed points to user space.
    pub fn display_to_user(&self) -> [f32; 6] {
        let (w, h) = (self.width, self.height);
        match self.rotation {
            90 => [0.0, 1.0, -1.0, 0.0, w, 0.0],
            180 => [-1.0, 0.0, 0.0, -1.0, w, h],
            270 => [0.0, -1.0, 1.0, 0.0, 0.0, h],
            _ => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        }
    }

    pub fn to_user(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.display_to_user();
        (a * x + c * y + e, b * x + d * y + f)
    }

    pub fn to_display(&self, x: f32, y: f32) -> (f32, f32) {
        let (w, h) = (self.width, self.height);
        match self.rotation {
            90 => (y, w - x),
            180 => (w - x, h - y),
            270 => (h - y, x),
            _ => (x, y),
        }
    }

    /// Move a displayed box into the displayed space of `target`.
    pub fn reframe(&self, bbox: &BoundingBox, target: &PageSpace) -> BoundingBox {
        if self.rotation == target.rotation {
            return *bbox;
        }
        let corners = [(bbox.x0, bbox.y0), (bbox.x1, bbox.y1)].map(|(x, y)| {
            let (ux, uy) = self.to_user(x, y);
            target.to_display(ux, uy)
        });
        let [(ax, ay), (bx, by)] = corners;
        BoundingBox::new(ax.min(bx), ay.min(by), ax.max(bx), ay.max(by))
    }
}

/// Fold any multiple of 90 degrees into `0..360`. Other angles count as 0.
pub fn normalize_rotation(angle: i64) -> u16 {
    match angle.rem_euclid(360) {
        r @ (90 | 180 | 270) => r as u16,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!BoundingBox::new(1.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!BoundingBox::new(0.0, 2.0, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_expand_and_shrink() {
        let b = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(b.expand(2.0), BoundingBox::new(8.0, 18.0, 32.0, 42.0));
        assert_eq!(b.shrink(1.0), BoundingBox::new(11.0, 21.0, 29.0, 39.0));
        // Shrinking past the middle yields a degenerate box
        assert!(!b.shrink(15.0).is_valid());
    }

    #[test]
    fn test_contains_point_is_inclusive() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains_point(0.0, 10.0));
        assert!(b.contains_point(5.0, 5.0));
        assert!(!b.contains_point(10.1, 5.0));
    }

    #[test]
    fn test_union_all() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            BoundingBox::new(5.0, -2.0, 6.0, 0.5),
        ];
        assert_eq!(
            BoundingBox::union_all(boxes.iter()),
            Some(BoundingBox::new(0.0, -2.0, 6.0, 1.0))
        );
        assert_eq!(BoundingBox::union_all(std::iter::empty()), None);
    }

    #[test]
    fn test_quarter_turn_corners() {
        // Letter page turned clockwise: the unrotated bottom-right corner is
        // the displayed bottom-left
        let space = PageSpace::new(90, 612.0, 792.0);
        assert_eq!(space.to_user(0.0, 0.0), (612.0, 0.0));
        assert_eq!(space.to_display(612.0, 0.0), (0.0, 0.0));
        assert_eq!(space.to_display(0.0, 792.0), (792.0, 612.0));

        let space = PageSpace::new(-90, 612.0, 792.0);
        assert_eq!(space.rotation, 270);
        assert_eq!(space.to_display(0.0, 792.0), (0.0, 0.0));
    }

    #[test]
    fn test_display_and_user_are_inverse() {
        for rotation in [0, 90, 180, 270] {
            let space = PageSpace::new(rotation, 612.0, 792.0);
            let (ux, uy) = space.to_user(100.0, 250.0);
            assert_eq!(space.to_display(ux, uy), (100.0, 250.0), "rotation {}", rotation);
        }
    }

    #[test]
    fn test_reframe_box_between_rotations() {
        let upright = PageSpace::new(0, 612.0, 792.0);
        let turned = upright.rotated(90);
        let word = BoundingBox::new(100.0, 700.0, 160.0, 720.0);

        let moved = upright.reframe(&word, &turned);
        assert_eq!(moved, BoundingBox::new(700.0, 452.0, 720.0, 512.0));
        assert_eq!(turned.reframe(&moved, &upright), word);
        assert_eq!(upright.reframe(&word, &upright), word);
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-180), 180);
        assert_eq!(normalize_rotation(45), 0);
    }
}
