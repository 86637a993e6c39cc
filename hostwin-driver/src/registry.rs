//! Per-window driver state, keyed by handle slot.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostwin_api::{
    GuestWindows, NativeRef, NativeWindowProvider, Parent, Placement, PlacementNotice, PosFlags,
    Rect, WindowHandle,
};
use hostwin_compositor::Surface;

use crate::DriverError;

/// Driver-side record of a guest window.
#[derive(Debug)]
pub struct WindowBinding {
    pub handle: WindowHandle,
    /// `None` for top-level windows.
    pub parent: Option<WindowHandle>,
    pub window_rect: Rect,
    pub whole_rect: Rect,
    pub client_rect: Rect,
    native: Option<NativeRef>,
    pub surface: Option<Arc<Surface>>,
}

impl WindowBinding {
    pub fn native(&self) -> Option<&NativeRef> {
        self.native.as_ref()
    }

    /// Whether the current surface carries its own per-pixel alpha.
    pub fn has_argb_surface(&self) -> bool {
        self.surface.as_ref().is_some_and(|s| s.has_per_pixel_alpha())
    }
}

type Table = HashMap<u16, WindowBinding>;

/// All window bindings, behind one lock.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    table: Mutex<Table>,
}

/// A binding together with the registry lock. The lock is released on drop,
/// so do not hold a guard across surface work or calls back into the
/// registry.
pub struct BindingGuard<'a> {
    table: MutexGuard<'a, Table>,
    slot: u16,
}

impl Deref for BindingGuard<'_> {
    type Target = WindowBinding;

    fn deref(&self) -> &WindowBinding {
        &self.table[&self.slot]
    }
}

impl DerefMut for BindingGuard<'_> {
    fn deref_mut(&mut self) -> &mut WindowBinding {
        match self.table.get_mut(&self.slot) {
            Some(binding) => binding,
            // Entries are only removed with the lock held.
            None => unreachable!("binding vanished under the registry lock"),
        }
    }
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the registry and return the binding for `handle`.
    ///
    /// `None` (with the lock released) for the null handle or when the slot
    /// is empty or holds another window.
    pub fn acquire(&self, handle: WindowHandle) -> Option<BindingGuard<'_>> {
        if handle.is_null() {
            return None;
        }
        let table = self.lock();
        let slot = handle.slot();
        match table.get(&slot) {
            Some(binding) if binding.handle == handle => Some(BindingGuard { table, slot }),
            _ => None,
        }
    }

    pub fn release(&self, guard: Option<BindingGuard<'_>>) {
        drop(guard);
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.acquire(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a fresh binding and return it locked. The native window is
    /// created before the lock is taken.
    pub fn allocate(
        &self,
        handle: WindowHandle,
        parent: Option<WindowHandle>,
        host: &dyn NativeWindowProvider,
    ) -> Result<BindingGuard<'_>, DriverError> {
        let native = host.create(handle);
        let mut table = self.lock();
        if table.try_reserve(1).is_err() {
            return Err(DriverError::Allocation(handle));
        }
        let slot = handle.slot();
        if let Some(stale) = table.get(&slot) {
            if stale.handle != handle {
                tracing::debug!("slot {} reused: {:?} replaces {:?}", slot, handle, stale.handle);
            }
        }
        table.insert(
            slot,
            WindowBinding {
                handle,
                parent,
                window_rect: Rect::ZERO,
                whole_rect: Rect::ZERO,
                client_rect: Rect::ZERO,
                native,
                surface: None,
            },
        );
        tracing::trace!("allocated binding for {:?} (parent {:?})", handle, parent);
        Ok(BindingGuard { table, slot })
    }

    /// Return the binding for `handle`, creating it and any missing ancestors
    /// first, outermost ancestor first.
    ///
    /// With `rects` (window and client rectangle) the binding starts there.
    /// Without them the geometry is read from the guest, which is then told
    /// where the window sits.
    pub fn create_if_absent<'a>(
        &'a self,
        handle: WindowHandle,
        rects: Option<(Rect, Rect)>,
        guest: &dyn GuestWindows,
        host: &dyn NativeWindowProvider,
    ) -> Result<BindingGuard<'a>, DriverError> {
        if let Some(guard) = self.acquire(handle) {
            return Ok(guard);
        }
        // The desktop and message-only windows have no parent.
        let parent = match guest.parent(handle) {
            Some(Parent::Desktop) => None,
            Some(Parent::Window(parent)) if parent == guest.desktop_window() => None,
            Some(Parent::Window(parent)) => Some(parent),
            None => return Err(DriverError::NoParent(handle)),
        };
        if let Some(parent) = parent {
            drop(self.create_if_absent(parent, None, guest, host)?);
        }

        let mut guard = self.allocate(handle, parent, host)?;
        match rects {
            Some((window_rect, client_rect)) => {
                guard.window_rect = window_rect;
                guard.whole_rect = window_rect;
                guard.client_rect = client_rect;
                Ok(guard)
            }
            None => {
                let placement = guest.placement(handle).unwrap_or(Placement {
                    window_rect: Rect::ZERO,
                    client_rect: Rect::ZERO,
                });
                guard.window_rect = placement.window_rect;
                guard.whole_rect = placement.window_rect;
                guard.client_rect = placement.client_rect;
                drop(guard);

                let notice = PlacementNotice {
                    window_rect: placement.window_rect,
                    client_rect: placement.client_rect,
                    whole_rect: placement.window_rect,
                    style: guest.style(handle),
                    flags: PosFlags::NOACTIVATE,
                    insert_after: guest.prev_sibling(handle),
                    owner: guest.owner(handle),
                };
                guest.notify_placement(handle, &notice);
                self.acquire(handle).ok_or(DriverError::Vanished(handle))
            }
        }
    }

    /// Forget `handle`, dropping its surface and native window. Unknown
    /// handles are ignored.
    pub fn destroy(&self, handle: WindowHandle) -> bool {
        let removed = {
            let Some(guard) = self.acquire(handle) else {
                return false;
            };
            let BindingGuard { mut table, slot } = guard;
            table.remove(&slot)
        };
        // Surface and native window go away outside the lock.
        if let Some(binding) = removed {
            tracing::trace!("destroyed binding for {:?}", binding.handle);
        }
        true
    }

    /// Grab the native window of `handle`.
    pub fn native_window(&self, handle: WindowHandle) -> Option<NativeRef> {
        self.acquire(handle)?.native.clone()
    }

    /// The current surface of `handle`, shared.
    pub fn surface(&self, handle: WindowHandle) -> Option<Arc<Surface>> {
        self.acquire(handle)?.surface.clone()
    }
}
