//! Driver error types.

use hostwin_api::WindowHandle;
use hostwin_bridge::BridgeError;
use hostwin_compositor::SurfaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("window {0:?} has no parent this process can resolve")]
    NoParent(WindowHandle),

    #[error("out of memory allocating binding for {0:?}")]
    Allocation(WindowHandle),

    #[error("window {0:?} went away during setup")]
    Vanished(WindowHandle),

    #[error("event bridge: {0}")]
    Bridge(#[from] BridgeError),

    #[error("surface: {0}")]
    Surface(#[from] SurfaceError),

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
