//! On-demand capture of a small square around a point, returned as PNG.

use crate::backend::ScreenSource;
use crate::error::{PickerError, PickerResult};
use crate::geometry::{find_monitor, CaptureRect, Monitor, Point};
use tracing::debug;

/// Default side length of the magnified region, in logical points.
pub const DEFAULT_MAGNIFIER_SIDE: u32 = 11;

/// Smallest and largest accepted side lengths.
pub const MAGNIFIER_SIDE_RANGE: (u32, u32) = (9, 13);

/// Normalize a configured side length: odd, within `MAGNIFIER_SIDE_RANGE`.
pub fn normalize_side(side: u32) -> u32 {
    let (min, max) = MAGNIFIER_SIDE_RANGE;
    let side = side.clamp(min, max);
    if side % 2 == 0 {
        side - 1
    } else {
        side
    }
}

/// Height of the primary monitor: the one anchored at the desktop origin,
/// or the first one listed.
pub fn primary_height(monitors: &[Monitor]) -> Option<f64> {
    monitors
        .iter()
        .find(|m| m.frame.x == 0.0 && m.frame.y == 0.0)
        .or_else(|| monitors.first())
        .map(|m| m.frame.height)
}

/// A `side`×`side` rectangle centered on `point`, clamped inside `monitor`.
pub fn magnifier_rect(monitor: &Monitor, point: Point, side: u32) -> CaptureRect {
    let (lx, ly) = monitor.to_capture_space(point);
    let width = side.min(monitor.frame.width.max(0.0) as u32);
    let height = side.min(monitor.frame.height.max(0.0) as u32);
    let half = (side / 2) as i32;
    let max_x = (monitor.frame.width as i32 - width as i32).max(0);
    let max_y = (monitor.frame.height as i32 - height as i32).max(0);
    CaptureRect {
        x: (lx.floor() as i32 - half).clamp(0, max_x),
        y: (ly.floor() as i32 - half).clamp(0, max_y),
        width,
        height,
    }
}

/// Captures the magnified view. Independent of any tracking session.
pub struct MagnifierCapture<'a> {
    screens: &'a dyn ScreenSource,
    side: u32,
}

impl<'a> MagnifierCapture<'a> {
    pub fn new(screens: &'a dyn ScreenSource, side: u32) -> Self {
        Self {
            screens,
            side: normalize_side(side),
        }
    }

    /// Capture around `(x, y)`, given in top-left-origin desktop coordinates,
    /// and encode it as PNG.
    pub fn capture(&self, x: f64, y: f64) -> PickerResult<Vec<u8>> {
        let monitors = self.screens.monitors();
        let height = primary_height(&monitors).ok_or(PickerError::ScreenNotFound)?;
        let point = Point::from_top_left(x, y, height);
        let monitor = find_monitor(&monitors, point).ok_or(PickerError::ScreenNotFound)?;

        let rect = magnifier_rect(monitor, point, self.side);
        debug!(x, y, monitor = monitor.id, ?rect, "magnifier capture");

        let image = self.screens.capture(monitor, rect)?;
        image.encode_png()
    }
}
