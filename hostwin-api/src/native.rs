//! Host native-window collaborator.

use std::fmt;
use std::sync::Arc;

use crate::{NativeSurface, Rect, WindowHandle};

/// A host buffer locked for writing.
///
/// Pixels are 32-bit, in the same layout as the compositor's buffer, indexed
/// `y * stride + x` in window coordinates.
pub trait HostBuffer {
    /// The rectangle the host actually granted, which may be larger than the
    /// one requested.
    fn rect(&self) -> Rect;

    /// Row pitch in pixels.
    fn stride(&self) -> usize;

    /// Number of rows in the buffer.
    fn height(&self) -> usize;

    fn pixels_mut(&mut self) -> &mut [u32];

    /// Unlock the buffer and queue it for presentation.
    fn post(self: Box<Self>);
}

/// A host window that accepts pixels for a guest window.
///
/// Dropping the last reference releases the host window.
pub trait NativeWindow: Send + Sync + fmt::Debug {
    /// Lock a buffer covering at least `dirty`. Returns `None` when the host
    /// surface is not ready; the caller retries on the next update.
    fn lock_buffer(&self, dirty: Rect) -> Option<Box<dyn HostBuffer + '_>>;
}

/// Shared reference to a native window. Cloning it is the grab operation.
pub type NativeRef = Arc<dyn NativeWindow>;

/// Creates and tears down host windows.
pub trait NativeWindowProvider: Send + Sync {
    /// Create the host-side window for a guest window.
    fn create(&self, window: WindowHandle) -> Option<NativeRef>;

    /// Attach (or detach, for `None`) a host drawing surface to a window.
    fn register_surface(&self, window: WindowHandle, surface: Option<NativeSurface>);

    /// Destroy the host-side window of a guest window that went away.
    fn destroy(&self, window: WindowHandle);
}
