//! Monitor enumeration.
//!
//! Backends report displays in top-left-origin global coordinates; they
//! are converted here into the bottom-left desktop space the engine uses.
//!
//! Platform implementations:
//! - macOS: Core Graphics display list (`macos.rs`)
//! - Windows/Linux: `screenshots` display info (`screens.rs`)

use crate::{PlatformError, PlatformResult};
use pipette_core::{Monitor, Rect};
use std::cell::RefCell;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(target_os = "macos"))]
mod screens;

/// A display as reported by the OS, top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDisplay {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale_factor: f64,
    /// 0 when the OS does not report a rate.
    pub refresh_hz: f64,
    pub is_primary: bool,
}

/// Convert raw displays into desktop monitors, primary first.
pub fn to_monitors(mut raw: Vec<RawDisplay>) -> Vec<Monitor> {
    // Stable sort keeps the OS order among secondary displays.
    raw.sort_by_key(|d| !d.is_primary);
    let Some(primary_height) = raw.first().map(|d| d.height) else {
        return Vec::new();
    };
    raw.into_iter()
        .map(|d| Monitor {
            id: d.id,
            frame: Rect::from_top_left(d.x, d.y, d.width, d.height, primary_height),
            scale_factor: d.scale_factor,
            refresh_hz: d.refresh_hz,
        })
        .collect()
}

/// OS handle kept next to each monitor for capture.
#[cfg(target_os = "macos")]
pub type DisplayHandle = ();

/// OS handle kept next to each monitor for capture.
#[cfg(not(target_os = "macos"))]
pub type DisplayHandle = screenshots::Screen;

/// Enumerate displays along with their capture handles.
fn enumerate() -> PlatformResult<Vec<(RawDisplay, DisplayHandle)>> {
    #[cfg(target_os = "macos")]
    {
        Ok(macos::displays()?.into_iter().map(|d| (d, ())).collect())
    }
    #[cfg(not(target_os = "macos"))]
    {
        screens::displays()
    }
}

/// Enumerate connected monitors.
pub fn monitors() -> PlatformResult<Vec<Monitor>> {
    let raw = enumerate()?.into_iter().map(|(d, _)| d).collect();
    let monitors = to_monitors(raw);
    if monitors.is_empty() {
        return Err(PlatformError::NoDisplays);
    }
    Ok(monitors)
}

type Loader<H> = Box<dyn Fn() -> PlatformResult<Vec<(RawDisplay, H)>>>;

struct Layout<H> {
    at: Instant,
    monitors: Vec<Monitor>,
    handles: Vec<(u32, H)>,
}

/// Display layout refreshed at most once per `ttl`.
///
/// Sampling asks for the layout and captures on every tick; both are served
/// from the same snapshot so displays are enumerated once per `ttl`.
pub struct DisplayCache<H> {
    ttl: Duration,
    load: Loader<H>,
    cached: RefCell<Option<Layout<H>>>,
}

/// Cache over the OS display list.
pub type MonitorCache = DisplayCache<DisplayHandle>;

impl<H: Clone> DisplayCache<H> {
    pub fn with_loader<F>(ttl: Duration, load: F) -> Self
    where
        F: Fn() -> PlatformResult<Vec<(RawDisplay, H)>> + 'static,
    {
        Self {
            ttl,
            load: Box::new(load),
            cached: RefCell::new(None),
        }
    }

    fn refresh(&self) {
        let mut cached = self.cached.borrow_mut();
        if let Some(layout) = cached.as_ref() {
            if layout.at.elapsed() < self.ttl {
                return;
            }
        }

        match (self.load)() {
            Ok(list) => {
                let handles = list.iter().map(|(d, h)| (d.id, h.clone())).collect();
                let monitors = to_monitors(list.into_iter().map(|(d, _)| d).collect());
                debug!(count = monitors.len(), "monitor layout refreshed");
                *cached = Some(Layout {
                    at: Instant::now(),
                    monitors,
                    handles,
                });
            }
            Err(e) => warn!(error = %e, "failed to enumerate monitors"),
        }
    }

    pub fn get(&self) -> Vec<Monitor> {
        self.refresh();
        self.cached
            .borrow()
            .as_ref()
            .map(|layout| layout.monitors.clone())
            .unwrap_or_default()
    }

    /// Capture handle for a monitor, from the current snapshot.
    pub fn handle(&self, id: u32) -> Option<H> {
        self.refresh();
        self.cached.borrow().as_ref().and_then(|layout| {
            layout
                .handles
                .iter()
                .find(|(handle_id, _)| *handle_id == id)
                .map(|(_, h)| h.clone())
        })
    }

    /// Height of the primary monitor, used to flip top-left input coordinates.
    pub fn primary_height(&self) -> Option<f64> {
        self.get().first().map(|m| m.frame.height)
    }
}

impl Default for MonitorCache {
    fn default() -> Self {
        Self::with_loader(Duration::from_secs(1), enumerate)
    }
}
