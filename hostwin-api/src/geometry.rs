//! Integer rectangles in guest coordinates.

/// A rectangle with exclusive right/bottom edges.
///
/// Coordinates follow the guest convention: `left`/`top` are inclusive,
/// `right`/`bottom` exclusive. A rectangle with `left >= right` or
/// `top >= bottom` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const ZERO: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    /// Accumulator start value: inverted so any real rectangle widens it.
    pub const EMPTY_BOUNDS: Self = Self {
        left: i32::MAX,
        top: i32::MAX,
        right: i32::MIN,
        bottom: i32::MIN,
    };

    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// A rectangle at the origin with the given size.
    #[inline]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// The same size, moved to the origin.
    #[inline]
    pub const fn local(&self) -> Self {
        Self::from_size(self.width(), self.height())
    }

    #[inline]
    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// Intersection of two rectangles, or [`Rect::ZERO`] when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let rect = Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if rect.is_empty() { Rect::ZERO } else { rect }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Widen `self` so it covers `rect`. Empty rectangles are ignored.
    pub fn add_bounds(&mut self, rect: &Rect) {
        if rect.is_empty() {
            return;
        }
        self.left = self.left.min(rect.left);
        self.top = self.top.min(rect.top);
        self.right = self.right.max(rect.right);
        self.bottom = self.bottom.max(rect.bottom);
    }

    /// Check whether `other` lies entirely inside `self`. An empty `other` is
    /// always contained.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.left >= self.left
                && other.top >= self.top
                && other.right <= self.right
                && other.bottom <= self.bottom)
    }

    #[inline]
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_disjoint_is_zero() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 30, 30);
        assert_eq!(a.intersection(&b), Rect::ZERO);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_intersection_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, -5, 15, 5);
        assert_eq!(a.intersection(&b), Rect::new(5, 0, 10, 5));
    }

    #[test]
    fn test_add_bounds_from_empty_sentinel() {
        let mut bounds = Rect::EMPTY_BOUNDS;
        assert!(bounds.is_empty());
        bounds.add_bounds(&Rect::new(4, 4, 8, 8));
        assert_eq!(bounds, Rect::new(4, 4, 8, 8));
        bounds.add_bounds(&Rect::new(0, 6, 2, 12));
        assert_eq!(bounds, Rect::new(0, 4, 8, 12));
    }

    #[test]
    fn test_add_bounds_ignores_empty() {
        let mut bounds = Rect::new(1, 1, 2, 2);
        bounds.add_bounds(&Rect::new(50, 50, 50, 60));
        assert_eq!(bounds, Rect::new(1, 1, 2, 2));
    }
}
