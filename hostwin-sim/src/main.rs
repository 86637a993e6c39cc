//! Hostwin Sim - Runs the driver against in-memory guest and host windows.
//!
//! A host thread reports the desktop size and window surfaces the way a real
//! host would; the main thread plays the guest window manager. Run with
//! `RUST_LOG=trace` to watch surfaces being created and flushed.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use hostwin_api::{
    AdmitMask, ColorRef, ExStyle, LayeredFlags, NativeSurface, NativeSurfaceId, Parent, PosFlags,
    Rect, Region, WindowHandle,
};
use hostwin_compositor::{FlushOutcome, MemoryHost};
use hostwin_driver::{Driver, DriverConfig, LayeredSource, LayeredUpdate, MemoryGuest, MEMORY_DESKTOP};
use tracing_subscriber::EnvFilter;

const MAIN_WINDOW: WindowHandle = WindowHandle(0x40);
const OVERLAY: WindowHandle = WindowHandle(0x60);

fn load_config() -> Result<DriverConfig> {
    match std::env::args().nth(1) {
        Some(path) => DriverConfig::from_file(Path::new(&path))
            .with_context(|| format!("loading config from {path}")),
        None => DriverConfig::from_env().context("reading HOSTWIN_* settings"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    tracing::info!("Starting hostwin simulation with {:?}", config);

    let guest = Arc::new(MemoryGuest::new());
    let host = Arc::new(MemoryHost::new(1024, 768));
    let driver = Arc::new(Driver::new(config, guest.clone(), host.clone()));

    driver
        .create_window(MEMORY_DESKTOP)
        .context("creating the desktop window")?;

    let producer = {
        let driver = driver.clone();
        thread::spawn(move || {
            driver.desktop_changed(1024, 768);
            for (window, width, height) in [(MAIN_WINDOW, 300, 200), (OVERLAY, 64, 64)] {
                driver.surface_changed(
                    window,
                    Some(NativeSurface {
                        id: NativeSurfaceId(window.0),
                        width,
                        height,
                    }),
                );
            }
        })
    };
    driver.create_desktop();
    let (width, height) = driver.screen_size();
    tracing::info!("desktop is {}x{}", width, height);

    // An ordinary window with a rounded-off corner.
    let rect = Rect::new(40, 30, 340, 230);
    guest.add_window(MAIN_WINDOW, Parent::Desktop, rect);
    let changing = driver.window_pos_changing(MAIN_WINDOW, PosFlags::SHOWWINDOW, rect, rect, None);
    driver.window_pos_changed(
        MAIN_WINDOW,
        None,
        PosFlags::SHOWWINDOW,
        rect,
        rect,
        changing.visible_rect,
        changing.surface,
    );
    let region = Region::from_rect(rect.local()).subtract(&Region::from_rect(Rect::new(0, 0, 16, 16)));
    guest.set_region(MAIN_WINDOW, Some(region.clone()));
    driver.set_window_region(MAIN_WINDOW, Some(region));

    if let Some(surface) = driver.registry().surface(MAIN_WINDOW) {
        {
            let mut guard = surface.lock();
            let local = surface.rect().local();
            for band in 0..4 {
                let top = local.top + band * local.height() / 4;
                let bottom = local.top + (band + 1) * local.height() / 4;
                let shade = 0x40 * (band as u32 + 1) - 1;
                guard.fill(&Rect::new(0, top, local.right, bottom), shade << 8);
            }
        }
        report("main window", surface.flush());
    }

    // A translucent layered overlay painted from its own image.
    let overlay = Rect::new(500, 400, 564, 464);
    guest.add_window(OVERLAY, Parent::Desktop, overlay);
    guest.set_ex_style(OVERLAY, ExStyle::LAYERED);
    let changing =
        driver.window_pos_changing(OVERLAY, PosFlags::SHOWWINDOW, overlay, overlay, None);
    driver.window_pos_changed(
        OVERLAY,
        None,
        PosFlags::SHOWWINDOW,
        overlay,
        overlay,
        changing.visible_rect,
        changing.surface,
    );
    let image: Vec<u32> = (0..64 * 64u32).map(|i| 0x8000_0000 | (i % 64) << 17).collect();
    let update = LayeredUpdate {
        source: Some(LayeredSource {
            pixels: &image,
            width: 64,
            height: 64,
            origin: (0, 0),
        }),
        ..LayeredUpdate::default()
    };
    if !driver.update_layered_window(OVERLAY, &update, overlay) {
        tracing::warn!("layered update of the overlay failed");
    }
    driver.set_layered_window_attributes(OVERLAY, ColorRef::INVALID, 200, LayeredFlags::ALPHA);

    producer
        .join()
        .map_err(|_| anyhow::anyhow!("host thread panicked"))?;
    let applied = driver.pump_events(AdmitMask::ALL_INPUT);
    tracing::info!("applied {} late host events", applied);

    for (name, window) in [("main window", MAIN_WINDOW), ("overlay", OVERLAY)] {
        let native = host
            .window(window)
            .with_context(|| format!("{name} has no host window"))?;
        let lit = native.snapshot().iter().filter(|&&p| p != 0).count();
        println!(
            "{name}: host surface {:?}, {} posts, {} lit pixels",
            host.surface(window).map(|s| (s.width, s.height)),
            native.post_count(),
            lit
        );
    }

    driver.destroy_window(OVERLAY);
    driver.child_destroyed(OVERLAY);
    driver.destroy_window(MAIN_WINDOW);
    driver.child_destroyed(MAIN_WINDOW);
    tracing::info!("{} bindings left", driver.registry().len());
    Ok(())
}

fn report(name: &str, outcome: FlushOutcome) {
    match outcome {
        FlushOutcome::Presented(rect) => tracing::info!("{} presented {:?}", name, rect),
        FlushOutcome::Declined => tracing::info!("{} flush declined by host", name),
        FlushOutcome::Clean => tracing::info!("{} had nothing to flush", name),
    }
}
