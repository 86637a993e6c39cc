//! The per-window software surface.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostwin_api::{ColorKey, ColorRef, NativeRef, Rect, Region, WindowHandle};

use crate::blit::{apply_color_key, apply_line_region, compose_row, ClipCursor};
use crate::error::SurfaceError;
use crate::format::BitmapFormat;

/// What a surface needs to know about its window.
///
/// Implementations look the window up in the window registry; they must not
/// be called with the registry lock already held.
pub trait SurfaceContext {
    /// Grab the window's native window.
    fn native_window(&self, window: WindowHandle) -> Option<NativeRef>;

    /// The window's `(window_rect, whole_rect)`, or `None` if the window has
    /// no binding.
    fn placement(&self, window: WindowHandle) -> Option<(Rect, Rect)>;

    /// The guest-level window region, in window coordinates.
    fn window_region(&self, window: WindowHandle) -> Option<Region>;
}

/// New clip source for [`Surface::update_clip`].
#[derive(Debug, Clone)]
pub enum ClipUpdate {
    /// Use this window region (window coordinates), or none at all.
    Region(Option<Region>),
    /// Fetch the window region again from the guest.
    FromWindow,
}

/// Result of a [`Surface::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was dirty; the host was not contacted.
    Clean,
    /// The host had no buffer to give. The update waits for the next flush.
    Declined,
    /// Pixels were written and posted.
    Presented(Rect),
}

#[derive(Debug)]
struct SurfaceState {
    pixels: Vec<u32>,
    /// Restriction set on the surface itself, in surface coordinates.
    shape: Option<Region>,
    /// Banded clip rectangles in surface coordinates; `None` means unclipped.
    clip: Option<Vec<Rect>>,
    alpha: u8,
    color_key: ColorKey,
    /// Local-coordinate union of everything touched since the last flush.
    dirty: Rect,
}

/// A window's off-screen pixel buffer plus compositing state.
///
/// Shared as `Arc<Surface>` between the window's binding and anyone drawing
/// or flushing; it is freed when the last reference drops.
#[derive(Debug)]
pub struct Surface {
    window: WindowHandle,
    /// Window-relative rectangle covered by the buffer.
    rect: Rect,
    format: BitmapFormat,
    native: Option<NativeRef>,
    state: Mutex<SurfaceState>,
}

/// Exclusive access to a surface's buffer and state. Unlocks on drop.
pub struct SurfaceGuard<'a> {
    surface: &'a Surface,
    state: MutexGuard<'a, SurfaceState>,
}

impl Surface {
    /// Create a surface covering `rect` (window-relative) for `window`.
    pub fn create(
        window: WindowHandle,
        rect: Rect,
        alpha: u8,
        color_key: ColorRef,
        per_pixel_alpha: bool,
        ctx: &dyn SurfaceContext,
    ) -> Result<Arc<Surface>, SurfaceError> {
        let (width, height) = (rect.width().max(0), rect.height().max(0));
        let format = BitmapFormat::new(width, height, per_pixel_alpha);
        let native = ctx.native_window(window);

        let count = width as usize * height as usize;
        let mut pixels = Vec::new();
        if pixels.try_reserve_exact(count).is_err() {
            return Err(SurfaceError::Allocation {
                width,
                height,
                bytes: format.image_size(),
            });
        }
        pixels.resize(count, 0);

        let surface = Arc::new(Surface {
            window,
            rect,
            format,
            native,
            state: Mutex::new(SurfaceState {
                pixels,
                shape: None,
                clip: None,
                alpha,
                color_key: ColorKey::from_color_ref(color_key),
                dirty: Rect::EMPTY_BOUNDS,
            }),
        });
        surface.update_clip(ClipUpdate::FromWindow, ctx);
        surface.lock().state.dirty = Rect::EMPTY_BOUNDS;

        tracing::trace!(
            "created surface for {:?} rect {:?} ({} bytes, per-pixel alpha {})",
            window,
            rect,
            format.image_size(),
            per_pixel_alpha
        );
        Ok(surface)
    }

    pub fn window(&self) -> WindowHandle {
        self.window
    }

    /// Window-relative rectangle covered by the buffer.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn format(&self) -> BitmapFormat {
        self.format
    }

    pub fn has_per_pixel_alpha(&self) -> bool {
        self.format.has_per_pixel_alpha()
    }

    pub fn native(&self) -> Option<&NativeRef> {
        self.native.as_ref()
    }

    /// Lock the surface. The lock is not re-entrant: the other methods on
    /// `Surface` lock internally and must not be called while a guard is alive.
    pub fn lock(&self) -> SurfaceGuard<'_> {
        SurfaceGuard {
            surface: self,
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Set or clear the surface's own shape, then recompute the clip from the
    /// window.
    pub fn set_shape(&self, shape: Option<Region>, ctx: &dyn SurfaceContext) {
        tracing::trace!("updating shape of surface for {:?}", self.window);
        self.lock().state.shape = shape;
        self.update_clip(ClipUpdate::FromWindow, ctx);
    }

    /// Recompute the clip rectangles and mark the whole surface dirty.
    ///
    /// The window region is moved from window to surface coordinates and
    /// intersected with the shape and the buffer rectangle. An explicit
    /// `ClipUpdate::Region(None)` always removes clipping; `FromWindow` removes
    /// it only when neither a window region nor a shape exists.
    pub fn update_clip(&self, update: ClipUpdate, ctx: &dyn SurfaceContext) {
        let Some((window_rect, whole_rect)) = ctx.placement(self.window) else {
            return;
        };
        let (dx, dy) = (
            window_rect.left - whole_rect.left,
            window_rect.top - whole_rect.top,
        );
        let shape = self.lock().state.shape.clone();

        let region = match update {
            ClipUpdate::Region(region) => region,
            ClipUpdate::FromWindow => match ctx.window_region(self.window) {
                Some(region) => Some(region),
                None if shape.is_some() => Some(Region::from_rect(window_rect.local())),
                None => None,
            },
        };

        let clip = region.map(|mut region| {
            region.offset(dx, dy);
            if let Some(shape) = &shape {
                region = region.intersect(shape);
            }
            region.intersect_rect(&self.rect).into_rects()
        });

        tracing::trace!(
            "clip for {:?}: {}",
            self.window,
            match &clip {
                Some(rects) => format!("{} rects", rects.len()),
                None => "none".to_string(),
            }
        );

        let mut guard = self.lock();
        guard.state.clip = clip;
        guard.invalidate();
    }

    /// Update opacity and color key. Marks the surface dirty if either
    /// effectively changed.
    pub fn set_layered(&self, alpha: u8, color_key: ColorRef) {
        let mut guard = self.lock();
        let key = ColorKey::from_color_ref(color_key);
        let changed = guard.state.alpha != alpha || guard.state.color_key != key;
        guard.state.alpha = alpha;
        guard.state.color_key = key;
        if changed {
            guard.invalidate();
        }
    }

    /// Push the dirty part of the buffer to the host.
    pub fn flush(&self) -> FlushOutcome {
        let mut guard = self.lock();
        let to_flush = guard.state.dirty.intersection(&self.rect.local());
        guard.state.dirty = Rect::EMPTY_BOUNDS;
        if to_flush.is_empty() {
            return FlushOutcome::Clean;
        }

        let Some(native) = &self.native else {
            tracing::trace!("no native window for {:?}, dropping flush", self.window);
            return FlushOutcome::Declined;
        };

        let state = &*guard.state;
        tracing::trace!(
            "flushing {:?} rect {:?} dirty {:?} alpha {:02x} key {:?} clip {} rects",
            self.window,
            self.rect,
            to_flush,
            state.alpha,
            state.color_key,
            state.clip.as_ref().map_or(0, Vec::len)
        );

        let request = to_flush.offset(self.rect.left, self.rect.top);
        let Some(mut buffer) = native.lock_buffer(request) else {
            tracing::trace!("unable to lock host buffer for {:?}", self.window);
            return FlushOutcome::Declined;
        };

        let extent = Rect::from_size(buffer.stride() as i32, buffer.height() as i32);
        let rect = buffer.rect().intersection(&self.rect).intersection(&extent);

        if !rect.is_empty() {
            let width = rect.width() as usize;
            let src_stride = self.rect.width() as usize;
            let dst_stride = buffer.stride();
            let src_x = (rect.left - self.rect.left) as usize;
            let per_pixel_alpha = self.format.has_per_pixel_alpha();
            let mut cursor = state.clip.as_deref().map(ClipCursor::new);
            let dst_pixels = buffer.pixels_mut();

            for (row, y) in (rect.top..rect.bottom).enumerate() {
                let src_start = (rect.top - self.rect.top) as usize * src_stride
                    + row * src_stride
                    + src_x;
                let dst_start = y as usize * dst_stride + rect.left as usize;
                let (Some(src), Some(dst)) = (
                    state.pixels.get(src_start..src_start + width),
                    dst_pixels.get_mut(dst_start..dst_start + width),
                ) else {
                    tracing::warn!("host buffer for {:?} is shorter than advertised", self.window);
                    break;
                };

                compose_row(dst, src, per_pixel_alpha, state.alpha);
                apply_color_key(dst, src, state.color_key);
                if let Some(cursor) = cursor.as_mut() {
                    apply_line_region(dst, rect.left, y, cursor.row(y));
                }
            }
        }

        buffer.post();
        FlushOutcome::Presented(rect)
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        tracing::trace!("freeing surface for {:?} rect {:?}", self.window, self.rect);
    }
}

impl SurfaceGuard<'_> {
    pub fn surface(&self) -> &Surface {
        self.surface
    }

    /// The format descriptor together with the pixel buffer.
    pub fn format_and_pixels(&mut self) -> (BitmapFormat, &mut [u32]) {
        (self.surface.format, self.state.pixels.as_mut_slice())
    }

    pub fn pixels(&self) -> &[u32] {
        &self.state.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.state.pixels
    }

    /// The dirty accumulator itself, in surface-local coordinates.
    pub fn dirty_bounds_mut(&mut self) -> &mut Rect {
        &mut self.state.dirty
    }

    pub fn dirty_bounds(&self) -> Rect {
        self.state.dirty
    }

    /// Widen the dirty bounds to cover `rect` (surface-local).
    pub fn add_dirty(&mut self, rect: &Rect) {
        self.state.dirty.add_bounds(rect);
    }

    /// Mark the whole surface dirty.
    pub fn invalidate(&mut self) {
        self.state.dirty = self.surface.rect.local();
    }

    /// Cached clip rectangles in surface coordinates, if clipping is active.
    pub fn clip_rects(&self) -> Option<&[Rect]> {
        self.state.clip.as_deref()
    }

    pub fn alpha(&self) -> u8 {
        self.state.alpha
    }

    pub fn color_key(&self) -> ColorKey {
        self.state.color_key
    }

    /// Fill a surface-local rectangle with one pixel value and mark it dirty.
    pub fn fill(&mut self, rect: &Rect, pixel: u32) {
        let rect = rect.intersection(&self.surface.rect.local());
        if rect.is_empty() {
            return;
        }
        let stride = self.surface.rect.width() as usize;
        for y in rect.top..rect.bottom {
            let start = y as usize * stride + rect.left as usize;
            self.state.pixels[start..start + rect.width() as usize].fill(pixel);
        }
        self.add_dirty(&rect);
    }
}
