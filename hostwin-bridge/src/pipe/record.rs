//! Fixed-layout wire records for events.

use bytemuck::{Pod, Zeroable};
use hostwin_api::{Event, NativeSurface, NativeSurfaceId, WindowHandle};

const KIND_DESKTOP_CHANGED: u32 = 1;
const KIND_SURFACE_CHANGED: u32 = 2;

/// One event as it travels through the pipe.
///
/// Every record has the same size, so a single read yields exactly one event
/// and a write either queues a whole record or nothing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct EventRecord {
    pub kind: u32,
    pub width: u32,
    pub height: u32,
    pub has_surface: u32,
    pub window: u64,
    pub surface: u64,
}

impl EventRecord {
    pub const SIZE: usize = std::mem::size_of::<EventRecord>();

    pub fn encode(event: &Event) -> Self {
        let mut record = EventRecord::zeroed();
        match *event {
            Event::DesktopChanged { width, height } => {
                record.kind = KIND_DESKTOP_CHANGED;
                record.width = width;
                record.height = height;
            }
            Event::SurfaceChanged { window, surface } => {
                record.kind = KIND_SURFACE_CHANGED;
                record.window = window.0;
                if let Some(surface) = surface {
                    record.has_surface = 1;
                    record.surface = surface.id.0;
                    record.width = surface.width;
                    record.height = surface.height;
                }
            }
        }
        record
    }

    /// The event this record carries, or `None` for an unknown kind.
    pub fn decode(&self) -> Option<Event> {
        match self.kind {
            KIND_DESKTOP_CHANGED => Some(Event::DesktopChanged {
                width: self.width,
                height: self.height,
            }),
            KIND_SURFACE_CHANGED => Some(Event::SurfaceChanged {
                window: WindowHandle(self.window),
                surface: (self.has_surface != 0).then(|| NativeSurface {
                    id: NativeSurfaceId(self.surface),
                    width: self.width,
                    height: self.height,
                }),
            }),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
