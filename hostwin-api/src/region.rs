//! Rectangle-list regions.
//!
//! A [`Region`] is stored in banded form: rectangles are sorted by `top`, then
//! `left`; rectangles in the same band share `top` and `bottom`; no two
//! rectangles overlap; and vertically adjacent bands with identical spans are
//! merged. The flush loop relies on this ordering to walk the list once per
//! surface, top to bottom.

use crate::Rect;

/// A set of pixels described as non-overlapping rectangles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// The empty region.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        if rect.is_empty() {
            return Self::new();
        }
        Self { rects: vec![rect] }
    }

    /// Union of arbitrary, possibly overlapping, rectangles.
    pub fn from_rects<I: IntoIterator<Item = Rect>>(rects: I) -> Self {
        let rects: Vec<Rect> = rects.into_iter().filter(|r| !r.is_empty()).collect();
        Self {
            rects: combine(&rects, &[], |a, b| a || b),
        }
    }

    /// The banded rectangles, y-then-x ascending.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn into_rects(self) -> Vec<Rect> {
        self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Smallest rectangle covering the region.
    pub fn bounds(&self) -> Rect {
        let mut bounds = Rect::EMPTY_BOUNDS;
        for rect in &self.rects {
            bounds.add_bounds(rect);
        }
        if bounds.is_empty() { Rect::ZERO } else { bounds }
    }

    /// Number of pixels covered.
    pub fn area(&self) -> i64 {
        self.rects
            .iter()
            .map(|r| r.width() as i64 * r.height() as i64)
            .sum()
    }

    pub fn offset(&mut self, dx: i32, dy: i32) {
        for rect in &mut self.rects {
            *rect = rect.offset(dx, dy);
        }
    }

    pub fn intersect(&self, other: &Region) -> Region {
        Region {
            rects: combine(&self.rects, &other.rects, |a, b| a && b),
        }
    }

    pub fn intersect_rect(&self, rect: &Rect) -> Region {
        self.intersect(&Region::from_rect(*rect))
    }

    pub fn union(&self, other: &Region) -> Region {
        Region {
            rects: combine(&self.rects, &other.rects, |a, b| a || b),
        }
    }

    pub fn subtract(&self, other: &Region) -> Region {
        Region {
            rects: combine(&self.rects, &other.rects, |a, b| a && !b),
        }
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains_point(x, y))
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Region::from_rect(rect)
    }
}

/// Horizontal spans of `rects` that fully cover the band `[top, bottom)`,
/// sorted and merged.
fn band_spans(rects: &[Rect], top: i32, bottom: i32) -> Vec<(i32, i32)> {
    let mut spans: Vec<(i32, i32)> = rects
        .iter()
        .filter(|r| r.top <= top && r.bottom >= bottom)
        .map(|r| (r.left, r.right))
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(i32, i32)> = Vec::with_capacity(spans.len());
    for (left, right) in spans {
        match merged.last_mut() {
            Some(last) if left <= last.1 => last.1 = last.1.max(right),
            _ => merged.push((left, right)),
        }
    }
    merged
}

fn span_contains(spans: &[(i32, i32)], x: i32) -> bool {
    spans.iter().any(|&(left, right)| x >= left && x < right)
}

/// Generic band sweep: a pixel is in the result when `op(in_a, in_b)` holds.
fn combine(a: &[Rect], b: &[Rect], op: impl Fn(bool, bool) -> bool) -> Vec<Rect> {
    let mut ys: Vec<i32> = a
        .iter()
        .chain(b.iter())
        .flat_map(|r| [r.top, r.bottom])
        .collect();
    ys.sort_unstable();
    ys.dedup();

    let mut out: Vec<Rect> = Vec::new();
    // Spans and first output index of the previous emitted band, for coalescing.
    let mut prev: Option<(Vec<(i32, i32)>, usize)> = None;

    for band in ys.windows(2) {
        let (top, bottom) = (band[0], band[1]);
        let spans_a = band_spans(a, top, bottom);
        let spans_b = band_spans(b, top, bottom);

        let mut xs: Vec<i32> = spans_a
            .iter()
            .chain(spans_b.iter())
            .flat_map(|&(l, r)| [l, r])
            .collect();
        xs.sort_unstable();
        xs.dedup();

        let mut spans: Vec<(i32, i32)> = Vec::new();
        for seg in xs.windows(2) {
            let (left, right) = (seg[0], seg[1]);
            if !op(span_contains(&spans_a, left), span_contains(&spans_b, left)) {
                continue;
            }
            match spans.last_mut() {
                Some(last) if last.1 == left => last.1 = right,
                _ => spans.push((left, right)),
            }
        }

        if spans.is_empty() {
            prev = None;
            continue;
        }

        if let Some((prev_spans, start)) = &prev {
            let adjacent = out[*start].bottom == top;
            if adjacent && *prev_spans == spans {
                for rect in &mut out[*start..] {
                    rect.bottom = bottom;
                }
                continue;
            }
        }

        let start = out.len();
        out.extend(
            spans
                .iter()
                .map(|&(left, right)| Rect::new(left, top, right, bottom)),
        );
        prev = Some((spans, start));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_banded(region: &Region) {
        let rects = region.rects();
        for pair in rects.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(
                a.top < b.top || (a.top == b.top && a.right <= b.left),
                "not banded: {:?} then {:?}",
                a,
                b
            );
            assert!(!a.intersects(&b));
        }
    }

    #[test]
    fn test_union_of_overlapping_rects() {
        let region = Region::from_rects([Rect::new(0, 0, 10, 10), Rect::new(5, 5, 15, 15)]);
        assert_banded(&region);
        assert_eq!(region.area(), 100 + 100 - 25);
        assert_eq!(region.bounds(), Rect::new(0, 0, 15, 15));
        assert_eq!(
            region.rects(),
            &[
                Rect::new(0, 0, 10, 5),
                Rect::new(0, 5, 15, 10),
                Rect::new(5, 10, 15, 15),
            ]
        );
    }

    #[test]
    fn test_coalesces_identical_bands() {
        let region = Region::from_rects([Rect::new(0, 0, 10, 5), Rect::new(0, 5, 10, 10)]);
        assert_eq!(region.rects(), &[Rect::new(0, 0, 10, 10)]);
    }

    #[test]
    fn test_two_spans_in_one_band() {
        let region = Region::from_rects([Rect::new(20, 0, 30, 10), Rect::new(0, 0, 10, 10)]);
        assert_eq!(
            region.rects(),
            &[Rect::new(0, 0, 10, 10), Rect::new(20, 0, 30, 10)]
        );
    }

    #[test]
    fn test_intersect() {
        let a = Region::from_rects([Rect::new(0, 0, 10, 10), Rect::new(20, 0, 30, 10)]);
        let b = Region::from_rect(Rect::new(5, 5, 25, 20));
        let c = a.intersect(&b);
        assert_banded(&c);
        assert_eq!(
            c.rects(),
            &[Rect::new(5, 5, 10, 10), Rect::new(20, 5, 25, 10)]
        );
    }

    #[test]
    fn test_subtract_makes_hole() {
        let outer = Region::from_rect(Rect::new(0, 0, 30, 30));
        let hole = Region::from_rect(Rect::new(10, 10, 20, 20));
        let ring = outer.subtract(&hole);
        assert_banded(&ring);
        assert_eq!(ring.area(), 900 - 100);
        assert!(!ring.contains_point(15, 15));
        assert!(ring.contains_point(5, 15));
        assert!(ring.contains_point(25, 15));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(Region::from_rect(Rect::new(5, 5, 5, 10)).is_empty());
        let a = Region::from_rect(Rect::new(0, 0, 4, 4));
        assert!(a.intersect(&Region::new()).is_empty());
        assert_eq!(a.union(&Region::new()), a);
        assert_eq!(Region::new().bounds(), Rect::ZERO);
    }

    #[test]
    fn test_offset() {
        let mut region = Region::from_rect(Rect::new(0, 0, 4, 4));
        region.offset(3, -2);
        assert_eq!(region.rects(), &[Rect::new(3, -2, 7, 2)]);
    }
}
