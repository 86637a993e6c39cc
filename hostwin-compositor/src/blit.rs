//! Scanline operations used by surface flushes.
//!
//! Pixels are `0xAARRGGBB` words. All functions work on one row at a time so
//! the flush loop never needs a second full-surface buffer.

use hostwin_api::{ColorKey, Rect};

#[inline]
fn scale(channel: u32, alpha: u32) -> u32 {
    (channel & 0xff) * alpha / 255
}

/// Copy one row of surface pixels into the host row, applying opacity.
///
/// Per-pixel alpha rows already carry their coverage and are copied as is.
/// Other rows are opaque: at full alpha only the coverage byte is forced,
/// otherwise every channel is scaled by `alpha / 255` and coverage set to
/// `alpha`.
pub fn compose_row(dst: &mut [u32], src: &[u32], per_pixel_alpha: bool, alpha: u8) {
    if per_pixel_alpha {
        dst.copy_from_slice(src);
        return;
    }
    if alpha == 255 {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = s | 0xff00_0000;
        }
        return;
    }
    let a = alpha as u32;
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = (a << 24) | (scale(s >> 16, a) << 16) | (scale(s >> 8, a) << 8) | scale(s, a);
    }
}

/// Zero every destination pixel whose source color equals the key.
pub fn apply_color_key(dst: &mut [u32], src: &[u32], key: ColorKey) {
    if !key.is_enabled() {
        return;
    }
    for (d, &s) in dst.iter_mut().zip(src) {
        if key.matches(s) {
            *d = 0;
        }
    }
}

/// Zero the pixels of row `y` that no clip rectangle covers.
///
/// `dst` holds the row starting at column `x`. `rects` must start at the
/// first rectangle whose bottom is below `y` (see [`ClipCursor`]); the sweep
/// stops at the first rectangle of a later band.
pub fn apply_line_region(dst: &mut [u32], x: i32, y: i32, rects: &[Rect]) {
    let mut x = x as i64;
    let mut pos: i64 = 0;
    let mut width = dst.len() as i64;

    for rect in rects {
        if rect.top > y || width <= 0 {
            break;
        }
        let (left, right) = (rect.left as i64, rect.right as i64);
        if left > x {
            let gap = left - x;
            let n = gap.min(width) as usize;
            let start = pos as usize;
            dst[start..start + n].fill(0);
            pos += gap;
            width -= gap;
            x = left;
        }
        if right > x {
            pos += right - x;
            width -= right - x;
            x = right;
        }
    }
    if width > 0 {
        dst[pos as usize..].fill(0);
    }
}

/// Walks banded clip rectangles top to bottom, one row at a time.
#[derive(Debug, Clone)]
pub struct ClipCursor<'a> {
    rects: &'a [Rect],
}

impl<'a> ClipCursor<'a> {
    pub fn new(rects: &'a [Rect]) -> Self {
        Self { rects }
    }

    /// Rectangles that may cover row `y`. Rows must be visited in ascending
    /// order.
    pub fn row(&mut self, y: i32) -> &'a [Rect] {
        let skip = self.rects.iter().take_while(|r| r.bottom <= y).count();
        self.rects = &self.rects[skip..];
        self.rects
    }
}

/// Source-over blend of a premultiplied row onto `dst`.
///
/// `constant_alpha` scales the whole source. Without `source_alpha` the
/// source is treated as opaque.
pub fn blend_over(dst: &mut [u32], src: &[u32], constant_alpha: u8, source_alpha: bool) {
    let ca = constant_alpha as u32;
    for (d, &s) in dst.iter_mut().zip(src) {
        let s = if source_alpha { s } else { s | 0xff00_0000 };
        let sa = scale(s >> 24, ca);
        let inv = 255 - sa;
        let mut out = 0u32;
        for shift in [0, 8, 16, 24] {
            let sc = scale(s >> shift, ca);
            let dc = scale(*d >> shift, inv);
            out |= (sc + dc).min(255) << shift;
        }
        *d = out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: u32 = 0xffff_0000;

    #[test]
    fn test_half_alpha_scales_channels() {
        let mut dst = [0u32; 1];
        compose_row(&mut dst, &[RED], false, 128);
        assert_eq!(dst[0] >> 24, 128);
        assert_eq!((dst[0] >> 16) & 0xff, 255 * 128 / 255);
        assert_eq!(dst[0] & 0xffff, 0);
    }

    #[test]
    fn test_full_alpha_forces_coverage() {
        let mut dst = [0u32; 2];
        compose_row(&mut dst, &[0x0012_3456, 0x7f00_00ff], false, 255);
        assert_eq!(dst, [0xff12_3456, 0xff00_00ff]);
    }

    #[test]
    fn test_per_pixel_alpha_is_copied() {
        let mut dst = [0u32; 2];
        compose_row(&mut dst, &[0x8040_2010, 0x0000_0000], true, 10);
        assert_eq!(dst, [0x8040_2010, 0]);
    }

    #[test]
    fn test_color_key_zeroes_matches() {
        let src = [0xff00_ff00, 0xffff_0000, 0x0000_ff00];
        let mut dst = src;
        apply_color_key(&mut dst, &src, ColorKey::Rgb(0x00ff00));
        assert_eq!(dst, [0, 0xffff_0000, 0]);
    }

    #[test]
    fn test_line_region_gaps() {
        // Row 5 spans columns 10..20; rects cover 12..14 and 16..18.
        let rects = [Rect::new(12, 0, 14, 10), Rect::new(16, 0, 18, 10)];
        let mut dst = [1u32; 10];
        apply_line_region(&mut dst, 10, 5, &rects);
        assert_eq!(dst, [0, 0, 1, 1, 0, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn test_line_region_stops_at_next_band() {
        let rects = [Rect::new(0, 0, 4, 2), Rect::new(0, 8, 10, 9)];
        let mut dst = [1u32; 8];
        apply_line_region(&mut dst, 0, 1, &rects);
        assert_eq!(dst, [1, 1, 1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_line_region_rect_wider_than_row() {
        let rects = [Rect::new(-5, 0, 100, 1)];
        let mut dst = [1u32; 4];
        apply_line_region(&mut dst, 0, 0, &rects);
        assert_eq!(dst, [1; 4]);
    }

    #[test]
    fn test_line_region_gap_past_row_end() {
        let rects = [Rect::new(50, 0, 60, 1)];
        let mut dst = [1u32; 4];
        apply_line_region(&mut dst, 0, 0, &rects);
        assert_eq!(dst, [0; 4]);
    }

    #[test]
    fn test_line_region_no_rects_clears_row() {
        let mut dst = [7u32; 3];
        apply_line_region(&mut dst, 0, 0, &[]);
        assert_eq!(dst, [0; 3]);
    }

    #[test]
    fn test_cursor_skips_finished_bands() {
        let rects = [
            Rect::new(0, 0, 4, 2),
            Rect::new(0, 2, 8, 4),
            Rect::new(2, 4, 6, 6),
        ];
        let mut cursor = ClipCursor::new(&rects);
        assert_eq!(cursor.row(0).len(), 3);
        assert_eq!(cursor.row(1).len(), 3);
        assert_eq!(cursor.row(2)[0], rects[1]);
        assert_eq!(cursor.row(5)[0], rects[2]);
        assert!(cursor.row(6).is_empty());
    }

    #[test]
    fn test_blend_over_opaque_source_replaces() {
        let mut dst = [0xff00_00ffu32];
        blend_over(&mut dst, &[0xffff_0000], 255, true);
        assert_eq!(dst, [0xffff_0000]);
    }

    #[test]
    fn test_blend_over_transparent_source_keeps_dst() {
        let mut dst = [0xff00_00ffu32];
        blend_over(&mut dst, &[0x0000_0000], 255, true);
        assert_eq!(dst, [0xff00_00ff]);
    }

    #[test]
    fn test_blend_over_constant_alpha() {
        let mut dst = [0u32];
        blend_over(&mut dst, &[0x0000_00ff], 51, false);
        assert_eq!(dst[0] >> 24, 51);
        assert_eq!(dst[0] & 0xff, 51);
    }
}
