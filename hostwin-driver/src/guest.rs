//! In-memory guest window manager for headless runs and tests.

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::sync::{Mutex, MutexGuard, PoisonError};

use hostwin_api::{
    ColorRef, ExStyle, GuestWindows, LayeredAttributes, LayeredFlags, Parent, Placement,
    PlacementNotice, Rect, Region, WindowHandle, WindowStyle,
};

/// Handle of the desktop window in a fresh [`MemoryGuest`].
pub const MEMORY_DESKTOP: WindowHandle = WindowHandle(0x20);

#[derive(Debug, Clone)]
struct GuestWindow {
    parent: Parent,
    placement: Placement,
    style: WindowStyle,
    ex_style: ExStyle,
    region: Option<Region>,
    layered: Option<LayeredAttributes>,
    owner: Option<WindowHandle>,
    prev_sibling: Option<WindowHandle>,
}

#[derive(Debug, Default)]
struct GuestState {
    windows: HashMap<WindowHandle, GuestWindow>,
    notices: Vec<(WindowHandle, PlacementNotice)>,
    desktop_sizes: Vec<(u32, u32)>,
    waitables: Vec<RawFd>,
    refuse_waitables: bool,
}

/// A guest window manager that keeps its windows in a map and records what
/// the driver tells it.
#[derive(Debug, Default)]
pub struct MemoryGuest {
    state: Mutex<GuestState>,
}

impl MemoryGuest {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GuestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a visible window whose window and client rectangles are `rect`.
    pub fn add_window(&self, window: WindowHandle, parent: Parent, rect: Rect) {
        self.state().windows.insert(
            window,
            GuestWindow {
                parent,
                placement: Placement {
                    window_rect: rect,
                    client_rect: rect,
                },
                style: WindowStyle::VISIBLE,
                ex_style: ExStyle::empty(),
                region: None,
                layered: None,
                owner: None,
                prev_sibling: None,
            },
        );
    }

    fn update(&self, window: WindowHandle, f: impl FnOnce(&mut GuestWindow)) {
        if let Some(w) = self.state().windows.get_mut(&window) {
            f(w);
        }
    }

    pub fn set_style(&self, window: WindowHandle, style: WindowStyle) {
        self.update(window, |w| w.style = style);
    }

    pub fn set_ex_style(&self, window: WindowHandle, ex_style: ExStyle) {
        self.update(window, |w| w.ex_style = ex_style);
    }

    pub fn set_region(&self, window: WindowHandle, region: Option<Region>) {
        self.update(window, |w| w.region = region);
    }

    pub fn set_layered(&self, window: WindowHandle, key: ColorRef, alpha: u8, flags: LayeredFlags) {
        self.update(window, |w| w.layered = Some(LayeredAttributes { key, alpha, flags }));
    }

    pub fn set_owner(&self, window: WindowHandle, owner: Option<WindowHandle>) {
        self.update(window, |w| w.owner = owner);
    }

    pub fn set_placement(&self, window: WindowHandle, placement: Placement) {
        self.update(window, |w| w.placement = placement);
    }

    /// Make [`GuestWindows::register_waitable`] fail.
    pub fn refuse_waitables(&self) {
        self.state().refuse_waitables = true;
    }

    /// Placement notices received so far, oldest first.
    pub fn notices(&self) -> Vec<(WindowHandle, PlacementNotice)> {
        self.state().notices.clone()
    }

    /// Every desktop size applied so far.
    pub fn desktop_sizes(&self) -> Vec<(u32, u32)> {
        self.state().desktop_sizes.clone()
    }

    pub fn waitables(&self) -> Vec<RawFd> {
        self.state().waitables.clone()
    }
}

impl GuestWindows for MemoryGuest {
    fn desktop_window(&self) -> WindowHandle {
        MEMORY_DESKTOP
    }

    fn parent(&self, window: WindowHandle) -> Option<Parent> {
        if window == MEMORY_DESKTOP {
            return None;
        }
        self.state().windows.get(&window).map(|w| w.parent)
    }

    fn placement(&self, window: WindowHandle) -> Option<Placement> {
        self.state().windows.get(&window).map(|w| w.placement)
    }

    fn notify_placement(&self, window: WindowHandle, notice: &PlacementNotice) {
        self.state().notices.push((window, *notice));
    }

    fn window_region(&self, window: WindowHandle) -> Option<Region> {
        self.state().windows.get(&window)?.region.clone()
    }

    fn layered_attributes(&self, window: WindowHandle) -> Option<LayeredAttributes> {
        self.state().windows.get(&window)?.layered
    }

    fn style(&self, window: WindowHandle) -> WindowStyle {
        self.state()
            .windows
            .get(&window)
            .map_or(WindowStyle::empty(), |w| w.style)
    }

    fn ex_style(&self, window: WindowHandle) -> ExStyle {
        self.state()
            .windows
            .get(&window)
            .map_or(ExStyle::empty(), |w| w.ex_style)
    }

    fn owner(&self, window: WindowHandle) -> Option<WindowHandle> {
        self.state().windows.get(&window)?.owner
    }

    fn prev_sibling(&self, window: WindowHandle) -> Option<WindowHandle> {
        self.state().windows.get(&window)?.prev_sibling
    }

    fn resize_desktop(&self, width: u32, height: u32) {
        self.state().desktop_sizes.push((width, height));
    }

    fn register_waitable(&self, fd: BorrowedFd<'_>) -> io::Result<()> {
        let mut state = self.state();
        if state.refuse_waitables {
            return Err(io::Error::other("wait table full"));
        }
        state.waitables.push(fd.as_raw_fd());
        Ok(())
    }
}
