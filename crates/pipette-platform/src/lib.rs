//! pipette-platform: OS adapters for the pipette engine.
//!
//! This crate provides:
//! - Monitor enumeration and region capture (Core Graphics on macOS, `screenshots` elsewhere)
//! - Pointer location (Cocoa on macOS, `enigo` elsewhere)
//! - Overlay surfaces for the indicator ring
//! - A global keyboard listener for the save hotkey (`CGEventTap` on macOS, `rdev` elsewhere)
//! - DPI awareness on Windows
//!
//! Everything except the keyboard listener belongs to the engine thread.
//! On macOS that must be the main thread.

mod capture;
mod display;
mod dpi;
mod error;
mod keyboard;
mod overlay;
mod pointer;

use pipette_core::{EventSink, SessionParts, TickSource};
use std::rc::Rc;

pub use capture::{capture_region, screen_capture_permitted, DesktopScreens};
pub use display::{monitors, to_monitors, DisplayCache, DisplayHandle, MonitorCache, RawDisplay};
pub use dpi::{primary_scale_factor, set_dpi_aware, to_logical};
pub use error::{PlatformError, PlatformResult};
pub use keyboard::{modifier_for_key, modifiers_from_flags, KeyboardListener, ModifierTracker};
pub use overlay::PlatformSurfaces;
pub use pointer::DesktopPointer;

/// Assemble the desktop collaborators for a `SessionController`.
///
/// Call on the engine thread; the parts share one monitor cache.
pub fn desktop_parts(
    ticks: Box<dyn TickSource>,
    sink: Box<dyn EventSink>,
) -> PlatformResult<SessionParts> {
    let monitors = Rc::new(MonitorCache::default());
    Ok(SessionParts {
        screens: Box::new(DesktopScreens::new(monitors.clone())),
        pointer: Box::new(DesktopPointer::new(monitors.clone())?),
        surfaces: Box::new(PlatformSurfaces::new(monitors)),
        ticks,
        sink,
    })
}
