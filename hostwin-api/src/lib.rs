//! Hostwin API - Shared types between the guest window layer, the compositor
//! and the host surface provider.

mod color;
mod event;
mod flags;
mod geometry;
mod guest;
mod handle;
mod native;
mod region;

pub use color::*;
pub use event::*;
pub use flags::*;
pub use geometry::*;
pub use guest::*;
pub use handle::*;
pub use native::*;
pub use region::*;
