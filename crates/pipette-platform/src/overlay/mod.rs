//! Overlay surfaces for the indicator ring.
//!
//! Platform implementations:
//! - macOS: borderless click-through `NSWindow` with a drawing view (`macos.rs`)
//! - Windows: layered `WS_EX_TRANSPARENT` popup updated with `UpdateLayeredWindow` (`windows.rs`)
//! - Other: a surface that only traces what it would draw (`headless.rs`)

use crate::display::MonitorCache;
#[cfg(windows)]
use crate::PlatformError;
use pipette_core::{IndicatorStyle, Monitor, OverlaySurface, PickerResult, SurfaceFactory};
use std::rc::Rc;
use tracing::debug;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(windows)]
mod windows;

#[cfg(not(any(target_os = "macos", windows)))]
mod headless;

/// Creates native overlay surfaces. Must be used from the thread that owns
/// the UI (the main thread on macOS).
pub struct PlatformSurfaces {
    #[cfg_attr(not(windows), allow(dead_code))]
    monitors: Rc<MonitorCache>,
}

impl PlatformSurfaces {
    pub fn new(monitors: Rc<MonitorCache>) -> Self {
        #[cfg(target_os = "macos")]
        macos::prepare_application();

        Self { monitors }
    }
}

impl SurfaceFactory for PlatformSurfaces {
    fn create_surface(
        &mut self,
        monitor: &Monitor,
        style: IndicatorStyle,
    ) -> PickerResult<Box<dyn OverlaySurface>> {
        debug!(monitor = monitor.id, ?style, "creating overlay surface");

        #[cfg(target_os = "macos")]
        let surface = macos::RingWindow::create(monitor, style)?;

        #[cfg(windows)]
        let surface = {
            let screen = self.monitors.handle(monitor.id).ok_or_else(|| {
                PlatformError::Window(format!("monitor {} is no longer attached", monitor.id))
            })?;
            let origin = (screen.display_info.x, screen.display_info.y);
            windows::RingWindow::create(monitor, style, origin)?
        };

        #[cfg(not(any(target_os = "macos", windows)))]
        let surface = headless::HeadlessSurface::new(monitor, style);

        Ok(Box::new(surface))
    }
}
