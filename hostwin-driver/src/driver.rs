//! Window lifecycle entry points called by the guest window manager.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;

use hostwin_api::{
    AdmitMask, ColorRef, Event, ExStyle, GuestWindows, LayeredAttributes, LayeredFlags,
    NativeRef, NativeSurface, NativeWindowProvider, PlacementNotice, PosFlags, Rect, Region,
    StyleKind, WindowHandle, WindowStyle,
};
use hostwin_bridge::{EventBridge, EventSender, WaitStatus};
use hostwin_compositor::{blend_over, surface_rect, ClipUpdate, Surface, SurfaceContext};

use crate::{DriverConfig, DriverError, WindowRegistry};

/// Iconic windows are parked here, off every screen.
pub const ICONIC_POSITION: i32 = -32000;

#[derive(Debug, Clone, Copy)]
struct Screen {
    width: u32,
    height: u32,
    virtual_screen: Rect,
}

impl Screen {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            virtual_screen: Rect::from_size(width as i32, height as i32),
        }
    }
}

/// What [`Driver::window_pos_changing`] decided.
#[derive(Debug, Clone)]
pub struct PosChanging {
    pub visible_rect: Rect,
    pub surface: Option<Arc<Surface>>,
}

/// Blend parameters for [`Driver::update_layered_window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blend {
    pub constant_alpha: u8,
    /// The source carries premultiplied per-pixel alpha.
    pub source_alpha: bool,
}

impl Default for Blend {
    fn default() -> Self {
        Self {
            constant_alpha: 255,
            source_alpha: false,
        }
    }
}

/// Source pixels for a layered update, `0xAARRGGBB`, row-major.
#[derive(Debug, Clone, Copy)]
pub struct LayeredSource<'a> {
    pub pixels: &'a [u32],
    pub width: usize,
    pub height: usize,
    /// Source position matching the window's top-left corner.
    pub origin: (i32, i32),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredUpdate<'a> {
    /// `None` only updates the surface and color key.
    pub source: Option<LayeredSource<'a>>,
    /// Window-relative part to repaint; everything when absent.
    pub dirty: Option<Rect>,
    pub color_key: Option<ColorRef>,
    pub blend: Option<Blend>,
}

/// The display driver: window bindings, their surfaces and the host event
/// bridge.
pub struct Driver {
    config: DriverConfig,
    guest: Arc<dyn GuestWindows>,
    host: Arc<dyn NativeWindowProvider>,
    registry: WindowRegistry,
    screen: Mutex<Screen>,
    desktop: OnceLock<(EventBridge, EventSender)>,
}

impl Driver {
    pub fn new(
        config: DriverConfig,
        guest: Arc<dyn GuestWindows>,
        host: Arc<dyn NativeWindowProvider>,
    ) -> Self {
        let screen = Screen::new(config.screen_width, config.screen_height);
        Self {
            config,
            guest,
            host,
            registry: WindowRegistry::new(),
            screen: Mutex::new(screen),
            desktop: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn screen_size(&self) -> (u32, u32) {
        let screen = self.screen();
        (screen.width, screen.height)
    }

    pub fn virtual_screen(&self) -> Rect {
        self.screen().virtual_screen
    }

    /// Producer end of the event bridge, once the desktop exists.
    pub fn event_sender(&self) -> Option<EventSender> {
        self.desktop.get().map(|(_, sender)| sender.clone())
    }

    pub fn bridge(&self) -> Option<&EventBridge> {
        self.desktop.get().map(|(bridge, _)| bridge)
    }

    /// Whether the calling thread is the one that owns the event bridge.
    pub fn is_desktop_thread(&self) -> bool {
        self.bridge()
            .is_some_and(|b| b.consumer() == thread::current().id())
    }

    // Host callbacks. These run on the host's thread and only queue events.

    pub fn desktop_changed(&self, width: u32, height: u32) {
        tracing::info!("desktop_changed: {}x{}", width, height);
        self.send(&Event::DesktopChanged { width, height });
    }

    pub fn surface_changed(&self, window: WindowHandle, surface: Option<NativeSurface>) {
        if let Some(s) = &surface {
            tracing::info!("surface_changed: {:?} {}x{}", window, s.width, s.height);
        }
        self.send(&Event::SurfaceChanged { window, surface });
    }

    fn send(&self, event: &Event) {
        match self.desktop.get() {
            // Failures are logged by the sender.
            Some((_, sender)) => {
                let _ = sender.post(event);
            }
            None => tracing::warn!("no event bridge yet, dropping {:?}", event),
        }
    }

    // Event bridge, consumer side.

    /// Create the event bridge on the calling thread, which becomes the
    /// desktop thread.
    pub fn try_start_desktop(&self) -> Result<(), DriverError> {
        if self.desktop.get().is_some() {
            return Ok(());
        }
        let pair = EventBridge::establish(|fd| self.guest.register_waitable(fd))?;
        if self.desktop.set(pair).is_err() {
            tracing::debug!("desktop event bridge was started by another thread");
        }
        Ok(())
    }

    /// Like [`Driver::try_start_desktop`], but a driver without its event
    /// bridge cannot run, so failure ends the process.
    pub fn start_desktop(&self) {
        if let Err(e) = self.try_start_desktop() {
            tracing::error!("cannot start desktop event queue: {}", e);
            std::process::exit(1);
        }
    }

    fn apply_event(&self, event: &Event) {
        match *event {
            Event::DesktopChanged { width, height } => {
                tracing::trace!("DESKTOP_CHANGED {}x{}", width, height);
                *self.screen() = Screen::new(width, height);
                self.guest.resize_desktop(width, height);
            }
            Event::SurfaceChanged { window, surface } => {
                tracing::trace!("SURFACE_CHANGED {:?} {:?}", window, surface);
                self.host.register_surface(window, surface);
            }
        }
    }

    /// Message-wait hook. On the desktop thread, applies the host events
    /// `admit` lets through and returns how many ran; elsewhere returns 0.
    ///
    /// While an event is being applied only surface events are let through.
    pub fn pump_events(&self, admit: AdmitMask) -> usize {
        let Some(bridge) = self.bridge() else {
            return 0;
        };
        if bridge.consumer() != thread::current().id() {
            return 0;
        }
        let admit = if bridge.is_processing() {
            AdmitMask::empty()
        } else {
            admit
        };
        bridge.pump(admit, &|event: &Event| self.apply_event(event))
    }

    /// Wait for the host to report the desktop size.
    ///
    /// Gives up when a wait times out or the bridge fails; the desktop is then
    /// created with whatever size is known.
    pub fn create_desktop(&self) -> bool {
        let Some(bridge) = self.bridge() else {
            tracing::warn!("create_desktop called before the desktop window");
            return true;
        };
        while self.screen_size().0 == 0 {
            if bridge.wait_for_next(Some(self.config.desktop_wait())) != WaitStatus::Ready {
                tracing::error!("wait for desktop size timed out");
                break;
            }
            bridge.pump(AdmitMask::ALL_INPUT, &|event: &Event| self.apply_event(event));
        }
        true
    }

    // Window lifecycle.

    pub fn create_window(&self, window: WindowHandle) -> Result<(), DriverError> {
        tracing::trace!("create_window {:?}", window);
        if window == self.guest.desktop_window() {
            self.start_desktop();
            drop(self.registry.allocate(window, None, self.host.as_ref())?);
        }
        Ok(())
    }

    pub fn destroy_window(&self, window: WindowHandle) {
        self.registry.destroy(window);
    }

    /// A child of the desktop went away; tear down its host window.
    pub fn child_destroyed(&self, child: WindowHandle) {
        tracing::trace!("child destroyed {:?}", child);
        self.host.destroy(child);
    }

    /// Choose the surface for a window that is about to move.
    ///
    /// `current` is the surface the guest would otherwise use.
    pub fn window_pos_changing(
        &self,
        window: WindowHandle,
        flags: PosFlags,
        window_rect: Rect,
        client_rect: Rect,
        current: Option<Arc<Surface>>,
    ) -> PosChanging {
        tracing::trace!(
            "win {:?} window {:?} client {:?} style {:?} flags {:?}",
            window,
            window_rect,
            client_rect,
            self.guest.style(window),
            flags
        );
        let visible_rect = window_rect;
        let keep = |surface: Option<Arc<Surface>>| PosChanging {
            visible_rect,
            surface,
        };

        let binding = match self.registry.acquire(window) {
            Some(binding) => binding,
            None => match self.registry.create_if_absent(
                window,
                Some((window_rect, client_rect)),
                self.guest.as_ref(),
                self.host.as_ref(),
            ) {
                Ok(binding) => binding,
                Err(e) => {
                    tracing::debug!("no binding for {:?}: {}", window, e);
                    return keep(current);
                }
            },
        };

        if binding.parent.is_some()
            || flags.contains(PosFlags::HIDEWINDOW)
            || binding.has_argb_surface()
        {
            return keep(current);
        }

        let rect = surface_rect(&visible_rect, &self.virtual_screen());
        if let Some(existing) = binding.surface.as_ref().filter(|s| s.rect() == rect) {
            return keep(Some(existing.clone()));
        }
        drop(binding);

        if !flags.contains(PosFlags::SHOWWINDOW)
            && !self.guest.style(window).contains(WindowStyle::VISIBLE)
        {
            return keep(current);
        }

        let (alpha, key) = if self.guest.ex_style(window).contains(ExStyle::LAYERED) {
            self.guest
                .layered_attributes(window)
                .map_or((255, ColorRef::INVALID), |a| a.effective())
        } else {
            (255, ColorRef::INVALID)
        };

        match Surface::create(window, rect, alpha, key, false, self) {
            Ok(surface) => keep(Some(surface)),
            Err(e) => {
                tracing::warn!("cannot create surface for {:?}: {}", window, e);
                keep(None)
            }
        }
    }

    /// Store the new placement, attach `surface` and tell the host side.
    pub fn window_pos_changed(
        &self,
        window: WindowHandle,
        insert_after: Option<WindowHandle>,
        flags: PosFlags,
        window_rect: Rect,
        client_rect: Rect,
        visible_rect: Rect,
        surface: Option<Arc<Surface>>,
    ) {
        let style = self.guest.style(window);
        let Some(mut binding) = self.registry.acquire(window) else {
            return;
        };
        binding.window_rect = window_rect;
        binding.whole_rect = visible_rect;
        binding.client_rect = client_rect;

        // A layered window keeps the surface it painted itself.
        let replaced = if binding.has_argb_surface() {
            None
        } else {
            std::mem::replace(&mut binding.surface, surface)
        };
        let top_level = binding.parent.is_none();
        drop(binding);
        drop(replaced);

        let owner = if top_level { self.guest.owner(window) } else { None };
        tracing::trace!(
            "win {:?} window {:?} client {:?} style {:?} owner {:?} flags {:?}",
            window,
            window_rect,
            client_rect,
            style,
            owner,
            flags
        );
        self.guest.notify_placement(
            window,
            &PlacementNotice {
                window_rect,
                client_rect,
                whole_rect: visible_rect,
                style,
                flags,
                insert_after,
                owner,
            },
        );
    }

    /// Adjust a show request. Iconic windows always go off-screen.
    pub fn show_window(&self, window: WindowHandle, rect: &mut Rect, flags: PosFlags) -> PosFlags {
        if rect.is_empty() || !self.guest.style(window).contains(WindowStyle::MINIMIZE) {
            return flags;
        }
        if rect.left == ICONIC_POSITION && rect.top == ICONIC_POSITION {
            return flags;
        }
        *rect = rect.offset(ICONIC_POSITION - rect.left, ICONIC_POSITION - rect.top);
        flags - (PosFlags::NOMOVE | PosFlags::NOCLIENTMOVE)
    }

    /// Toggling the layered style resets layered attributes.
    pub fn set_window_style(&self, window: WindowHandle, kind: StyleKind, old: u32, new: u32) {
        if window == self.guest.desktop_window() || kind != StyleKind::ExStyle {
            return;
        }
        if !ExStyle::from_bits_truncate(old ^ new).contains(ExStyle::LAYERED) {
            return;
        }
        let Some(mut binding) = self.registry.acquire(window) else {
            return;
        };
        if binding.has_argb_surface() {
            let dropped = binding.surface.take();
            drop(binding);
            drop(dropped);
        } else if let Some(surface) = binding.surface.clone() {
            drop(binding);
            surface.set_layered(255, ColorRef::INVALID);
        }
    }

    pub fn set_window_region(&self, window: WindowHandle, region: Option<Region>) {
        let Some(binding) = self.registry.acquire(window) else {
            tracing::debug!("region not supported on foreign window {:?}", window);
            return;
        };
        let surface = binding.surface.clone();
        drop(binding);
        if let Some(surface) = surface {
            surface.update_clip(ClipUpdate::Region(region), self);
        }
    }

    pub fn set_layered_window_attributes(
        &self,
        window: WindowHandle,
        key: ColorRef,
        alpha: u8,
        flags: LayeredFlags,
    ) {
        let (alpha, key) = LayeredAttributes { key, alpha, flags }.effective();
        if let Some(surface) = self.registry.surface(window) {
            surface.set_layered(alpha, key);
        }
    }

    /// Paint a layered window from a caller-supplied image.
    ///
    /// The window gets a per-pixel-alpha surface the size of `window_rect`.
    /// Returns `false` if the window is unknown, the surface cannot be
    /// created or the source does not cover the painted area.
    pub fn update_layered_window(
        &self,
        window: WindowHandle,
        update: &LayeredUpdate<'_>,
        window_rect: Rect,
    ) -> bool {
        let color_key = update.color_key.unwrap_or(ColorRef::INVALID);
        let rect = window_rect.local();

        let Some(binding) = self.registry.acquire(window) else {
            return false;
        };
        let reusable = binding
            .surface
            .as_ref()
            .filter(|s| s.has_per_pixel_alpha() && s.rect() == rect)
            .cloned();
        drop(binding);

        let surface = match reusable {
            Some(surface) => {
                surface.set_layered(255, color_key);
                surface
            }
            None => {
                let created = Surface::create(window, rect, 255, color_key, true, self);
                let Some(mut binding) = self.registry.acquire(window) else {
                    return false;
                };
                let replaced =
                    std::mem::replace(&mut binding.surface, created.as_ref().ok().cloned());
                drop(binding);
                drop(replaced);
                match created {
                    Ok(surface) => surface,
                    Err(e) => {
                        tracing::warn!("cannot create layered surface for {:?}: {}", window, e);
                        return false;
                    }
                }
            }
        };

        let Some(source) = update.source else {
            return true;
        };
        let paint = match update.dirty {
            Some(dirty) => rect.intersection(&dirty),
            None => rect,
        };
        let blend = update.blend.unwrap_or_default();

        let painted = {
            let mut guard = surface.lock();
            let ok = blend_rect(guard.pixels_mut(), rect.width() as usize, &paint, &source, blend);
            if ok && !paint.is_empty() {
                guard.add_dirty(&paint);
            }
            ok
        };
        surface.flush();
        painted
    }

    /// Repaint a window completely. Layered windows are pushed right away.
    pub fn refresh_window(&self, window: WindowHandle) {
        let Some(surface) = self.registry.surface(window) else {
            return;
        };
        surface.lock().invalidate();
        if surface.has_per_pixel_alpha() {
            surface.flush();
        }
    }
}

/// Clear `paint` in `dst` and blend the matching source pixels over it.
fn blend_rect(
    dst: &mut [u32],
    dst_stride: usize,
    paint: &Rect,
    source: &LayeredSource<'_>,
    blend: Blend,
) -> bool {
    if paint.is_empty() {
        return true;
    }
    let (sx, sy) = (paint.left + source.origin.0, paint.top + source.origin.1);
    let width = paint.width() as usize;
    if sx < 0
        || sy < 0
        || sx as usize + width > source.width
        || (sy + paint.height()) as usize > source.height
    {
        tracing::debug!("layered source does not cover {:?}", paint);
        return false;
    }
    for row in 0..paint.height() as usize {
        let d = (paint.top as usize + row) * dst_stride + paint.left as usize;
        let s = (sy as usize + row) * source.width + sx as usize;
        let (Some(dst_row), Some(src_row)) = (
            dst.get_mut(d..d + width),
            source.pixels.get(s..s + width),
        ) else {
            return false;
        };
        dst_row.fill(0);
        blend_over(dst_row, src_row, blend.constant_alpha, blend.source_alpha);
    }
    true
}

impl SurfaceContext for Driver {
    fn native_window(&self, window: WindowHandle) -> Option<NativeRef> {
        self.registry.native_window(window)
    }

    fn placement(&self, window: WindowHandle) -> Option<(Rect, Rect)> {
        let binding = self.registry.acquire(window)?;
        Some((binding.window_rect, binding.whole_rect))
    }

    fn window_region(&self, window: WindowHandle) -> Option<Region> {
        self.guest.window_region(window)
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("windows", &self.registry.len())
            .field("screen", &*self.screen())
            .finish()
    }
}
