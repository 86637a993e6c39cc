//! Lifecycle events raised by the host on its callback thread.

use crate::{AdmitMask, NativeSurfaceId, WindowHandle};

/// A host drawing surface handed to a guest window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSurface {
    pub id: NativeSurfaceId,
    pub width: u32,
    pub height: u32,
}

/// Events delivered from the host callback thread to the message pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The host desktop was resized.
    DesktopChanged { width: u32, height: u32 },

    /// A window's host surface appeared (`Some`) or was revoked (`None`).
    SurfaceChanged {
        window: WindowHandle,
        surface: Option<NativeSurface>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DesktopChanged,
    SurfaceChanged,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DesktopChanged { .. } => EventKind::DesktopChanged,
            Event::SurfaceChanged { .. } => EventKind::SurfaceChanged,
        }
    }
}

impl EventKind {
    /// Whether an event of this kind may be applied under `mask`.
    ///
    /// Surface events always pass: other threads may be blocked until the
    /// surface is registered.
    pub fn admitted_by(self, mask: AdmitMask) -> bool {
        match self {
            EventKind::SurfaceChanged => true,
            EventKind::DesktopChanged => mask.contains(AdmitMask::SEND_MESSAGE),
        }
    }
}
