//! Screen capture of small monitor-local regions.
//!
//! Platform implementations:
//! - macOS: `CGDisplayCreateImageForRect`, redrawn into an sRGB bitmap (`macos.rs`)
//! - Windows/Linux: `screenshots` area capture on the cached `Screen` (`screens.rs`)

use crate::display::MonitorCache;
#[cfg(not(target_os = "macos"))]
use crate::PlatformError;
use crate::PlatformResult;
use pipette_core::{CaptureRect, CapturedImage, Monitor, PickerResult, ScreenSource};
use std::rc::Rc;
use tracing::trace;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(target_os = "macos"))]
mod screens;

/// Capture `rect` (monitor-local, top-left origin, points) from `monitor`.
pub fn capture_region(
    monitors: &MonitorCache,
    monitor: &Monitor,
    rect: CaptureRect,
) -> PlatformResult<CapturedImage> {
    trace!(monitor = monitor.id, ?rect, "capturing region");

    #[cfg(target_os = "macos")]
    {
        let _ = monitors;
        macos::capture(monitor.id, rect)
    }
    #[cfg(not(target_os = "macos"))]
    {
        let screen = monitors.handle(monitor.id).ok_or(PlatformError::NoDisplays)?;
        screens::capture(&screen, rect)
    }
}

/// Whether this process may read screen contents.
///
/// Only macOS gates capture behind a permission; elsewhere this is always
/// true.
pub fn screen_capture_permitted() -> bool {
    #[cfg(target_os = "macos")]
    {
        macos::preflight_access()
    }
    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}

/// `ScreenSource` backed by the OS display list and capture APIs.
pub struct DesktopScreens {
    monitors: Rc<MonitorCache>,
}

impl DesktopScreens {
    pub fn new(monitors: Rc<MonitorCache>) -> Self {
        Self { monitors }
    }
}

impl ScreenSource for DesktopScreens {
    fn monitors(&self) -> Vec<Monitor> {
        self.monitors.get()
    }

    fn capture(&self, monitor: &Monitor, rect: CaptureRect) -> PickerResult<CapturedImage> {
        Ok(capture_region(&self.monitors, monitor, rect)?)
    }
}
