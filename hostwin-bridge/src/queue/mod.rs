//! Consumer-side event queue.
//!
//! Only the message-pump thread that established the bridge reads from it.
//! Applying an event may itself pump messages, so the queue is never locked
//! while a sink runs and events are removed before they are applied.

use std::collections::VecDeque;
use std::io;
use std::os::fd::BorrowedFd;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use hostwin_api::{AdmitMask, Event};

use crate::pipe::{channel, EventSender, EventSource, WaitStatus};
use crate::BridgeError;

/// Applies events taken off the queue.
pub trait EventSink {
    fn apply(&self, event: &Event);
}

impl<F: Fn(&Event)> EventSink for F {
    fn apply(&self, event: &Event) {
        self(event)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Event>,
    /// Events currently being applied, innermost last.
    in_progress: Vec<Event>,
}

#[derive(Debug)]
pub struct EventBridge {
    source: EventSource,
    consumer: ThreadId,
    state: Mutex<QueueState>,
}

/// Pops the in-progress marker even if the sink panics.
struct InProgress<'a> {
    bridge: &'a EventBridge,
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.bridge.state().in_progress.pop();
    }
}

impl EventBridge {
    /// Create the pipe and hand its read end to `register`, which adds it to
    /// the message pump's wait set. The calling thread becomes the consumer.
    pub fn establish<R>(register: R) -> Result<(EventBridge, EventSender), BridgeError>
    where
        R: FnOnce(BorrowedFd<'_>) -> io::Result<()>,
    {
        let (sender, source) = channel()?;
        register(source.as_fd()).map_err(BridgeError::Register)?;
        tracing::debug!("event bridge established on {:?}", thread::current().id());
        Ok((
            EventBridge {
                source,
                consumer: thread::current().id(),
                state: Mutex::new(QueueState::default()),
            },
            sender,
        ))
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn assert_consumer(&self, action: &str) {
        debug_assert_eq!(
            thread::current().id(),
            self.consumer,
            "event bridge {} from a foreign thread",
            action
        );
    }

    /// Move every record currently in the pipe onto the queue, in arrival
    /// order. Returns how many events were queued.
    pub fn drain_incoming(&self) -> usize {
        self.assert_consumer("drained");
        let mut queued = 0;
        loop {
            match self.source.read_record() {
                Ok(Some(record)) => match record.decode() {
                    Some(event) => {
                        tracing::trace!("queued {:?}", event);
                        self.state().pending.push_back(event);
                        queued += 1;
                    }
                    None => tracing::warn!("dropping event of unknown kind {}", record.kind),
                },
                Ok(None) => break,
                Err(BridgeError::ShortRead { read, expected }) => {
                    tracing::warn!("dropping partial event ({} of {} bytes)", read, expected);
                }
                Err(e) => {
                    tracing::warn!("event pipe read failed: {}", e);
                    break;
                }
            }
        }
        queued
    }

    /// Apply queued events that `admit` lets through, oldest first.
    ///
    /// Surface events always pass. Returns the number of events applied by
    /// this call; nested calls made from `sink` count their own.
    pub fn process_ready(&self, admit: AdmitMask, sink: &dyn EventSink) -> usize {
        self.assert_consumer("processed");
        let mut processed = 0;
        loop {
            let event = {
                let mut state = self.state();
                let Some(index) = state
                    .pending
                    .iter()
                    .position(|e| e.kind().admitted_by(admit))
                else {
                    break;
                };
                let Some(event) = state.pending.remove(index) else {
                    break;
                };
                state.in_progress.push(event);
                event
            };
            let _marker = InProgress { bridge: self };
            tracing::debug!("processing {:?}", event);
            sink.apply(&event);
            processed += 1;
        }
        processed
    }

    /// Drain the pipe, then apply what `admit` lets through.
    pub fn pump(&self, admit: AdmitMask, sink: &dyn EventSink) -> usize {
        self.drain_incoming();
        self.process_ready(admit, sink)
    }

    /// Block until an event arrives or `timeout` expires.
    ///
    /// Must be called on the consumer thread and never from inside an event
    /// being applied.
    pub fn wait_for_next(&self, timeout: Option<Duration>) -> WaitStatus {
        self.assert_consumer("waited on");
        debug_assert!(!self.is_processing(), "event bridge waited on while processing");
        match self.source.poll(timeout) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("waiting for events failed: {}", e);
                WaitStatus::Error
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    pub fn is_processing(&self) -> bool {
        !self.state().in_progress.is_empty()
    }

    /// The innermost event being applied.
    pub fn current(&self) -> Option<Event> {
        self.state().in_progress.last().copied()
    }

    pub fn consumer(&self) -> ThreadId {
        self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::os::fd::AsRawFd;

    use hostwin_api::{NativeSurface, NativeSurfaceId, WindowHandle};

    fn bridge() -> (EventBridge, EventSender) {
        EventBridge::establish(|_| Ok(())).unwrap()
    }

    fn surface_event(window: u64) -> Event {
        Event::SurfaceChanged {
            window: WindowHandle(window),
            surface: Some(NativeSurface {
                id: NativeSurfaceId(window + 1),
                width: 100,
                height: 50,
            }),
        }
    }

    #[test]
    fn test_events_applied_in_order() {
        let (bridge, tx) = bridge();
        tx.post(&Event::DesktopChanged { width: 800, height: 600 }).unwrap();
        tx.post(&surface_event(0x20)).unwrap();
        assert_eq!(bridge.drain_incoming(), 2);

        let seen = RefCell::new(Vec::new());
        let n = bridge.process_ready(AdmitMask::ALL_INPUT, &|e: &Event| seen.borrow_mut().push(*e));
        assert_eq!(n, 2);
        assert_eq!(
            *seen.borrow(),
            vec![Event::DesktopChanged { width: 800, height: 600 }, surface_event(0x20)]
        );
        assert_eq!(bridge.pending(), 0);
    }

    #[test]
    fn test_restricted_mask_leaves_desktop_event_pending() {
        let (bridge, tx) = bridge();
        tx.post(&Event::DesktopChanged { width: 1, height: 2 }).unwrap();
        tx.post(&surface_event(0x40)).unwrap();

        let seen = RefCell::new(Vec::new());
        let n = bridge.pump(AdmitMask::empty(), &|e: &Event| seen.borrow_mut().push(*e));
        assert_eq!(n, 1);
        assert_eq!(*seen.borrow(), vec![surface_event(0x40)]);
        assert_eq!(bridge.pending(), 1);

        let n = bridge.process_ready(AdmitMask::SEND_MESSAGE, &|e: &Event| seen.borrow_mut().push(*e));
        assert_eq!(n, 1);
        assert_eq!(bridge.pending(), 0);
    }

    #[test]
    fn test_nested_processing_sees_current_event() {
        let (bridge, tx) = bridge();
        tx.post(&surface_event(0x10)).unwrap();
        tx.post(&surface_event(0x12)).unwrap();
        bridge.drain_incoming();

        let depth = RefCell::new(Vec::new());
        let sink = |e: &Event| {
            assert_eq!(bridge.current(), Some(*e));
            depth.borrow_mut().push(bridge.pending());
            // A nested pump applies the rest of the queue.
            let inner_count = bridge.process_ready(AdmitMask::empty(), &|inner: &Event| {
                assert_eq!(bridge.current(), Some(*inner));
            });
            depth.borrow_mut().push(inner_count);
        };
        // Each call reports only what it applied itself.
        let n = bridge.process_ready(AdmitMask::ALL_INPUT, &sink);
        assert_eq!(n, 1);
        assert_eq!(*depth.borrow(), vec![1, 1]);
        assert!(!bridge.is_processing());
        assert_eq!(bridge.pending(), 0);
    }

    #[test]
    fn test_wait_reports_ready_and_timeout() {
        let (bridge, tx) = bridge();
        assert_eq!(
            bridge.wait_for_next(Some(Duration::from_millis(5))),
            WaitStatus::Timeout
        );
        tx.post(&surface_event(0x2)).unwrap();
        assert_eq!(bridge.wait_for_next(Some(Duration::from_millis(5))), WaitStatus::Ready);
    }

    #[test]
    fn test_wait_reports_hangup() {
        let (bridge, tx) = bridge();
        drop(tx);
        assert_eq!(bridge.wait_for_next(None), WaitStatus::Error);
    }

    #[test]
    fn test_registration_failure_is_reported() {
        let result = EventBridge::establish(|_| Err(io::Error::other("table full")));
        assert!(matches!(result, Err(BridgeError::Register(_))));
    }

    #[test]
    fn test_registration_receives_read_end() {
        let mut registered = None;
        let (bridge, _tx) = EventBridge::establish(|fd| {
            registered = Some(fd.as_raw_fd());
            Ok(())
        })
        .unwrap();
        assert_eq!(registered, Some(bridge.source.as_fd().as_raw_fd()));
    }

    #[cfg(debug_assertions)]
    fn on_other_thread<T, F>(f: F) -> T
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        thread::scope(|s| match s.spawn(f).join() {
            Ok(value) => value,
            Err(payload) => std::panic::resume_unwind(payload),
        })
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "event bridge drained from a foreign thread")]
    fn test_drain_off_consumer_thread_panics() {
        let (bridge, tx) = bridge();
        tx.post(&surface_event(0x4)).unwrap();
        on_other_thread(|| bridge.drain_incoming());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "event bridge processed from a foreign thread")]
    fn test_process_off_consumer_thread_panics() {
        let (bridge, tx) = bridge();
        tx.post(&surface_event(0x4)).unwrap();
        bridge.drain_incoming();
        on_other_thread(|| bridge.process_ready(AdmitMask::ALL_INPUT, &|_: &Event| {}));
    }

    #[test]
    fn test_partial_record_is_dropped() {
        let (bridge, tx) = bridge();
        tx.write_raw(&[0u8; 5]).unwrap();
        assert_eq!(bridge.drain_incoming(), 0);
        tx.post(&surface_event(0x8)).unwrap();
        assert_eq!(bridge.drain_incoming(), 1);
    }
}
