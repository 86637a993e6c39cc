//! Surface error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("cannot allocate {bytes} bytes of pixels for a {width}x{height} surface")]
    Allocation { width: i32, height: i32, bytes: usize },
}
