//! Guest window-management collaborator.

use std::io;
use std::os::fd::BorrowedFd;

use crate::{ColorRef, ExStyle, LayeredFlags, PosFlags, Rect, Region, WindowHandle, WindowStyle};

/// Parent of a guest window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// A top-level window.
    Desktop,
    /// A child window.
    Window(WindowHandle),
}

/// Current window and client rectangles, relative to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub window_rect: Rect,
    pub client_rect: Rect,
}

/// Placement notification sent to the host-facing side after a window moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementNotice {
    pub window_rect: Rect,
    pub client_rect: Rect,
    pub whole_rect: Rect,
    pub style: WindowStyle,
    pub flags: PosFlags,
    pub insert_after: Option<WindowHandle>,
    pub owner: Option<WindowHandle>,
}

/// Layered-window attributes as stored by the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayeredAttributes {
    pub key: ColorRef,
    pub alpha: u8,
    pub flags: LayeredFlags,
}

impl LayeredAttributes {
    /// Effective alpha and key: attributes without their flag fall back to
    /// opaque and no key.
    pub fn effective(&self) -> (u8, ColorRef) {
        let alpha = if self.flags.contains(LayeredFlags::ALPHA) { self.alpha } else { 255 };
        let key = if self.flags.contains(LayeredFlags::COLORKEY) {
            self.key
        } else {
            ColorRef::INVALID
        };
        (alpha, key)
    }
}

/// Everything the driver needs to ask of the guest window manager.
pub trait GuestWindows: Send + Sync {
    /// The desktop (root) window.
    fn desktop_window(&self) -> WindowHandle;

    /// Parent of `window`, or `None` if it has none this process can resolve
    /// (the desktop itself, message-only windows, foreign windows).
    fn parent(&self, window: WindowHandle) -> Option<Parent>;

    /// Current parent-relative placement.
    fn placement(&self, window: WindowHandle) -> Option<Placement>;

    /// Tell the host-facing side where a window now sits.
    fn notify_placement(&self, window: WindowHandle, notice: &PlacementNotice);

    /// The window region in window coordinates, or `None` if none is set.
    fn window_region(&self, window: WindowHandle) -> Option<Region>;

    fn layered_attributes(&self, window: WindowHandle) -> Option<LayeredAttributes>;

    fn style(&self, window: WindowHandle) -> WindowStyle;

    fn ex_style(&self, window: WindowHandle) -> ExStyle;

    fn owner(&self, window: WindowHandle) -> Option<WindowHandle>;

    /// The window directly above `window` in z-order.
    fn prev_sibling(&self, window: WindowHandle) -> Option<WindowHandle>;

    /// Apply a new host desktop size to the guest monitors and desktop window.
    fn resize_desktop(&self, width: u32, height: u32);

    /// Add an fd to the set of objects the message pump waits on.
    fn register_waitable(&self, fd: BorrowedFd<'_>) -> io::Result<()>;
}
