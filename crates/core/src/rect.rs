//! Axis-aligned integer rectangles.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle on the integer grid.
///
/// `(x, y)` is the lower-left corner; the rectangle covers the half-open
/// cell range `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Bottom edge.
    pub y: u32,
    /// Extent along x.
    pub width: u32,
    /// Extent along y.
    pub height: u32,
}

impl Rect {
    /// Creates a rectangle from its lower-left corner and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle anchored at the origin.
    pub fn sized(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive top edge.
    pub fn top(&self) -> u32 {
        self.y + self.height
    }

    /// Number of cells covered.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns true if the rectangle covers no cell.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns true if the two rectangles share at least one cell.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }

    /// The common part of two rectangles, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());
        Some(Rect::new(x, y, right - x, top - y))
    }

    /// Returns true if `other` lies completely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.top() <= self.top()
    }

    /// Returns true if the cell at `(x, y)` is covered.
    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.top()
    }

    /// Mirror image across the main diagonal.
    pub fn transposed(&self) -> Rect {
        Rect::new(self.y, self.x, self.height, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_rects_do_not_intersect() {
        let a = Rect::new(0, 0, 5, 5);
        let b = Rect::new(5, 0, 5, 5);
        let c = Rect::new(0, 5, 5, 5);
        assert!(!a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.intersects(&Rect::new(4, 4, 2, 2)));
    }

    #[test]
    fn test_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(6, 3, 10, 2);
        assert_eq!(a.intersection(&b), Some(Rect::new(6, 3, 4, 2)));
        assert_eq!(a.intersection(&Rect::new(10, 0, 1, 1)), None);
    }

    #[test]
    fn test_contains() {
        let outer = Rect::sized(10, 10);
        assert!(outer.contains(&Rect::new(0, 0, 10, 10)));
        assert!(outer.contains(&Rect::new(3, 4, 7, 6)));
        assert!(!outer.contains(&Rect::new(3, 4, 8, 6)));
        assert!(outer.contains_point(9, 9));
        assert!(!outer.contains_point(10, 0));
    }

    #[test]
    fn test_transposed() {
        let r = Rect::new(1, 2, 3, 4);
        assert_eq!(r.transposed(), Rect::new(2, 1, 4, 3));
        assert_eq!(r.transposed().transposed(), r);
        assert_eq!(r.area(), 12);
    }
}
