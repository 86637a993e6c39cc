//! Hostwin Bridge - Host callback events delivered to the message pump.
//!
//! The host raises lifecycle events on its own callback thread. They are
//! written as fixed-size records into a non-blocking pipe whose read end the
//! guest message pump waits on alongside its other objects; the pump thread
//! alone drains and applies them.

mod error;
pub mod pipe;
pub mod queue;

pub use error::BridgeError;
pub use pipe::{channel, EventRecord, EventSender, EventSource, WaitStatus};
pub use queue::{EventBridge, EventSink};
