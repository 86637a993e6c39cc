//! Event bridge error types.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("cannot create event pipe: {0}")]
    Pipe(#[source] nix::Error),

    #[error("cannot register event pipe with the message pump: {0}")]
    Register(#[source] io::Error),

    #[error("short write on event pipe ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    #[error("short read on event pipe ({read} of {expected} bytes)")]
    ShortRead { read: usize, expected: usize },

    #[error("poll on event pipe failed: {0}")]
    Poll(#[source] nix::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
