//! Hostwin Driver - Binds guest windows to host native windows.
//!
//! The guest window manager calls into a [`Driver`] as windows are created,
//! moved, shown, restyled and destroyed. The driver keeps a binding per
//! window in its [`WindowRegistry`], hands out compositor surfaces for
//! visible top-level windows, and applies host lifecycle events delivered
//! through the event bridge on the desktop thread.

mod config;
mod driver;
mod error;
mod guest;
mod registry;

pub use config::DriverConfig;
pub use driver::{Blend, Driver, LayeredSource, LayeredUpdate, PosChanging, ICONIC_POSITION};
pub use error::DriverError;
pub use guest::{MemoryGuest, MEMORY_DESKTOP};
pub use registry::{BindingGuard, WindowBinding, WindowRegistry};
