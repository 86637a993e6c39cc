//! Surface placement policy.

use hostwin_api::Rect;

/// Surface edges snap to this many pixels.
pub const SURFACE_ALIGN: i32 = 32;

/// Buffer rectangle for a window, relative to its visible rectangle.
///
/// The visible part is clamped to the virtual screen and then grown outward
/// to [`SURFACE_ALIGN`] on every edge, so small moves and resizes map to the
/// same rectangle and keep the existing surface.
pub fn surface_rect(visible: &Rect, virtual_screen: &Rect) -> Rect {
    let rect = visible
        .intersection(virtual_screen)
        .offset(-visible.left, -visible.top);
    let mask = !(SURFACE_ALIGN - 1);

    let left = rect.left & mask;
    let top = rect.top & mask;
    Rect {
        left,
        top,
        right: (left + SURFACE_ALIGN).max((rect.right + SURFACE_ALIGN - 1) & mask),
        bottom: (top + SURFACE_ALIGN).max((rect.bottom + SURFACE_ALIGN - 1) & mask),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect::new(0, 0, 1280, 720);

    fn check(visible: Rect) {
        let rect = surface_rect(&visible, &SCREEN);
        assert_eq!(rect.width() % SURFACE_ALIGN, 0, "{:?}", rect);
        assert_eq!(rect.height() % SURFACE_ALIGN, 0, "{:?}", rect);
        assert!(rect.width() >= SURFACE_ALIGN && rect.height() >= SURFACE_ALIGN);
        assert_eq!(rect.left % SURFACE_ALIGN, 0);
        assert_eq!(rect.top % SURFACE_ALIGN, 0);

        let local = visible
            .intersection(&SCREEN)
            .offset(-visible.left, -visible.top);
        assert!(rect.contains_rect(&local), "{:?} does not cover {:?}", rect, local);
    }

    #[test]
    fn test_on_screen_window() {
        assert_eq!(
            surface_rect(&Rect::new(100, 100, 300, 250), &SCREEN),
            Rect::new(0, 0, 224, 160)
        );
    }

    #[test]
    fn test_partially_off_screen_window() {
        // 50 pixels hang off the left edge; the buffer starts at the first
        // aligned column at or before the first visible one.
        assert_eq!(
            surface_rect(&Rect::new(-50, 10, 150, 110), &SCREEN),
            Rect::new(32, 0, 224, 128)
        );
    }

    #[test]
    fn test_tiny_window_gets_minimum_size() {
        assert_eq!(
            surface_rect(&Rect::new(10, 10, 11, 12), &SCREEN),
            Rect::new(0, 0, 32, 32)
        );
    }

    #[test]
    fn test_jitter_keeps_rect() {
        let a = surface_rect(&Rect::new(100, 100, 300, 250), &SCREEN);
        let b = surface_rect(&Rect::new(101, 100, 301, 251), &SCREEN);
        assert_eq!(a, b);
    }

    #[test]
    fn test_alignment_properties() {
        let mut seed: u32 = 0x1234_5678;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed % 3000) as i32 - 1000
        };
        for _ in 0..500 {
            let (x, y) = (next(), next());
            let (w, h) = (next().abs() % 900 + 1, next().abs() % 900 + 1);
            check(Rect::new(x, y, x + w, y + h));
        }
    }
}
