//! The byte pipe between the host callback thread and the message pump.

mod record;

pub use record::EventRecord;

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::sync::Arc;
use std::time::Duration;

use bytemuck::Zeroable;
use hostwin_api::Event;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::BridgeError;

/// Result of waiting on the read end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// At least one record can be read.
    Ready,
    Timeout,
    /// The pipe hung up or reported an error.
    Error,
}

/// Producer end. Cheap to clone; safe to use from any thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    file: Arc<File>,
}

/// Consumer end of the pipe.
#[derive(Debug)]
pub struct EventSource {
    file: File,
}

/// Create a close-on-exec, non-blocking pipe.
pub fn channel() -> Result<(EventSender, EventSource), BridgeError> {
    let (read, write) =
        nix::unistd::pipe2(OFlag::O_CLOEXEC | OFlag::O_NONBLOCK).map_err(BridgeError::Pipe)?;
    Ok((
        EventSender {
            file: Arc::new(File::from(write)),
        },
        EventSource {
            file: File::from(read),
        },
    ))
}

impl EventSender {
    /// Queue an event for the message pump.
    ///
    /// Never blocks. A failed or partial write drops the event; the error is
    /// logged and returned, and the pipe stays usable.
    pub fn post(&self, event: &Event) -> Result<(), BridgeError> {
        let record = EventRecord::encode(event);
        let bytes = record.as_bytes();
        let result = match (&*self.file).write(bytes) {
            Ok(n) if n == bytes.len() => Ok(()),
            Ok(n) => Err(BridgeError::ShortWrite {
                written: n,
                expected: bytes.len(),
            }),
            Err(e) => Err(BridgeError::Io(e)),
        };
        if let Err(e) = &result {
            tracing::warn!("failed to send event {:?}: {}", event, e);
        }
        result
    }

    #[cfg(test)]
    pub(crate) fn write_raw(&self, bytes: &[u8]) -> io::Result<usize> {
        (&*self.file).write(bytes)
    }
}

impl EventSource {
    /// Read one record without blocking. `Ok(None)` when the pipe is empty.
    pub fn read_record(&self) -> Result<Option<EventRecord>, BridgeError> {
        let mut record = EventRecord::zeroed();
        loop {
            match (&self.file).read(bytemuck::bytes_of_mut(&mut record)) {
                Ok(0) => return Ok(None),
                Ok(n) if n == EventRecord::SIZE => return Ok(Some(record)),
                Ok(n) => {
                    return Err(BridgeError::ShortRead {
                        read: n,
                        expected: EventRecord::SIZE,
                    })
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(BridgeError::Io(e)),
            }
        }
    }

    /// Block until the pipe is readable or `timeout` passes. `None` waits
    /// forever.
    pub fn poll(&self, timeout: Option<Duration>) -> Result<WaitStatus, BridgeError> {
        let timeout = poll_timeout(timeout);
        loop {
            let mut fds = [PollFd::new(
                self.file.as_fd(),
                PollFlags::POLLIN | PollFlags::POLLHUP,
            )];
            match poll(&mut fds, timeout) {
                Ok(0) => return Ok(WaitStatus::Timeout),
                Ok(_) => {
                    let revents = fds[0].revents().unwrap_or(PollFlags::empty());
                    if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
                        return Ok(WaitStatus::Error);
                    }
                    return Ok(WaitStatus::Ready);
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(BridgeError::Poll(e)),
            }
        }
    }

    /// The read end, for registration with a wait set.
    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Durations beyond what `poll` can express wait as long as it allows.
fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    match timeout {
        None => PollTimeout::NONE,
        Some(d) => PollTimeout::try_from(d).unwrap_or(PollTimeout::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostwin_api::{NativeSurface, NativeSurfaceId, WindowHandle};

    #[test]
    fn test_post_then_read() {
        let (tx, rx) = channel().unwrap();
        let event = Event::SurfaceChanged {
            window: WindowHandle(0x30),
            surface: Some(NativeSurface {
                id: NativeSurfaceId(7),
                width: 640,
                height: 480,
            }),
        };
        tx.post(&event).unwrap();
        let record = rx.read_record().unwrap().unwrap();
        assert_eq!(record.decode(), Some(event));
        assert!(rx.read_record().unwrap().is_none());
    }

    #[test]
    fn test_poll_timeout_and_ready() {
        let (tx, rx) = channel().unwrap();
        assert_eq!(rx.poll(Some(Duration::from_millis(10))).unwrap(), WaitStatus::Timeout);
        tx.post(&Event::DesktopChanged { width: 1, height: 1 }).unwrap();
        assert_eq!(rx.poll(Some(Duration::from_millis(10))).unwrap(), WaitStatus::Ready);
    }

    #[test]
    fn test_long_timeouts_keep_their_length() {
        assert_eq!(poll_timeout(Some(Duration::from_secs(70))).as_millis(), Some(70_000));
        assert_eq!(poll_timeout(Some(Duration::from_millis(20))).as_millis(), Some(20));
        assert_eq!(poll_timeout(Some(Duration::from_secs(u64::MAX))), PollTimeout::MAX);
        assert!(poll_timeout(None).is_none());
    }

    #[test]
    fn test_poll_reports_hangup() {
        let (tx, rx) = channel().unwrap();
        drop(tx);
        assert_eq!(rx.poll(Some(Duration::from_millis(10))).unwrap(), WaitStatus::Error);
    }

    #[test]
    fn test_short_read_is_an_error() {
        let (tx, rx) = channel().unwrap();
        tx.write_raw(&[1, 2, 3]).unwrap();
        assert!(matches!(
            rx.read_record(),
            Err(BridgeError::ShortRead { read: 3, .. })
        ));
        // The pipe is still usable afterwards.
        tx.post(&Event::DesktopChanged { width: 2, height: 3 }).unwrap();
        assert!(rx.read_record().unwrap().is_some());
    }
}
