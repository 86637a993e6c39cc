//! Hostwin Compositor - Software window surfaces.
//!
//! Each visible top-level window gets a [`Surface`]: a top-down 32-bit pixel
//! buffer the guest draws into. Flushing a surface copies its dirty part into
//! a host buffer, applying the window's opacity, color key and clip region on
//! the way.

mod blit;
mod error;
mod format;
mod geometry;
mod memory;
mod surface;

pub use blit::{apply_color_key, apply_line_region, blend_over, compose_row, ClipCursor};
pub use error::SurfaceError;
pub use format::{dib_image_size, dib_stride, BitmapFormat, Compression};
pub use geometry::{surface_rect, SURFACE_ALIGN};
pub use memory::{MemoryHost, MemoryWindow};
pub use surface::{ClipUpdate, FlushOutcome, Surface, SurfaceContext, SurfaceGuard};
