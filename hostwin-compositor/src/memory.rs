//! In-memory host windows for headless runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostwin_api::{
    HostBuffer, NativeRef, NativeSurface, NativeWindow, NativeWindowProvider, Rect, WindowHandle,
};

/// A host window backed by a plain pixel vector.
#[derive(Debug)]
pub struct MemoryWindow {
    width: usize,
    height: usize,
    pixels: Mutex<Vec<u32>>,
    ready: AtomicBool,
    /// When set, the host grants this rectangle instead of the requested one.
    grant: Mutex<Option<Rect>>,
    last_request: Mutex<Option<Rect>>,
    locks: AtomicUsize,
    posts: AtomicUsize,
}

struct MemoryBuffer<'a> {
    window: &'a MemoryWindow,
    pixels: MutexGuard<'a, Vec<u32>>,
    rect: Rect,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryWindow {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: Mutex::new(vec![0; width * height]),
            ready: AtomicBool::new(true),
            grant: Mutex::new(None),
            last_request: Mutex::new(None),
            locks: AtomicUsize::new(0),
            posts: AtomicUsize::new(0),
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Make [`NativeWindow::lock_buffer`] succeed or decline.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Override the rectangle granted by the next locks.
    pub fn set_grant(&self, rect: Option<Rect>) {
        *lock(&self.grant) = rect;
    }

    /// Number of successful buffer locks.
    pub fn lock_count(&self) -> usize {
        self.locks.load(Ordering::SeqCst)
    }

    /// Number of buffers posted for presentation.
    pub fn post_count(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    /// The rectangle passed to the most recent lock attempt.
    pub fn last_request(&self) -> Option<Rect> {
        *lock(&self.last_request)
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        lock(&self.pixels)[y * self.width + x]
    }

    pub fn fill(&self, pixel: u32) {
        lock(&self.pixels).fill(pixel);
    }

    pub fn snapshot(&self) -> Vec<u32> {
        lock(&self.pixels).clone()
    }
}

impl NativeWindow for MemoryWindow {
    fn lock_buffer(&self, dirty: Rect) -> Option<Box<dyn HostBuffer + '_>> {
        *lock(&self.last_request) = Some(dirty);
        if !self.ready.load(Ordering::SeqCst) {
            return None;
        }
        let rect = lock(&self.grant).unwrap_or(dirty);
        self.locks.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MemoryBuffer {
            window: self,
            pixels: lock(&self.pixels),
            rect,
        }))
    }
}

impl HostBuffer for MemoryBuffer<'_> {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn stride(&self) -> usize {
        self.window.width
    }

    fn height(&self) -> usize {
        self.window.height
    }

    fn pixels_mut(&mut self) -> &mut [u32] {
        self.pixels.as_mut_slice()
    }

    fn post(self: Box<Self>) {
        self.window.posts.fetch_add(1, Ordering::SeqCst);
    }
}

/// A native-window provider that keeps every window in memory.
#[derive(Debug)]
pub struct MemoryHost {
    width: usize,
    height: usize,
    windows: Mutex<HashMap<WindowHandle, Arc<MemoryWindow>>>,
    surfaces: Mutex<HashMap<WindowHandle, NativeSurface>>,
    destroyed: Mutex<Vec<WindowHandle>>,
}

impl MemoryHost {
    /// Windows created by this host get buffers of this size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            windows: Mutex::new(HashMap::new()),
            surfaces: Mutex::new(HashMap::new()),
            destroyed: Mutex::new(Vec::new()),
        }
    }

    pub fn window(&self, window: WindowHandle) -> Option<Arc<MemoryWindow>> {
        lock(&self.windows).get(&window).cloned()
    }

    /// The host surface currently registered for `window`.
    pub fn surface(&self, window: WindowHandle) -> Option<NativeSurface> {
        lock(&self.surfaces).get(&window).copied()
    }

    pub fn destroyed(&self) -> Vec<WindowHandle> {
        lock(&self.destroyed).clone()
    }
}

impl NativeWindowProvider for MemoryHost {
    fn create(&self, window: WindowHandle) -> Option<NativeRef> {
        let native = Arc::new(MemoryWindow::new(self.width, self.height));
        lock(&self.windows).insert(window, native.clone());
        Some(native)
    }

    fn register_surface(&self, window: WindowHandle, surface: Option<NativeSurface>) {
        let mut surfaces = lock(&self.surfaces);
        match surface {
            Some(surface) => {
                surfaces.insert(window, surface);
            }
            None => {
                surfaces.remove(&window);
            }
        }
    }

    fn destroy(&self, window: WindowHandle) {
        lock(&self.windows).remove(&window);
        lock(&self.destroyed).push(window);
    }
}
