//! Single-pixel sampling under a desktop point.

use crate::backend::ScreenSource;
use crate::color::ColorSample;
use crate::error::{PickerError, PickerResult};
use crate::geometry::{find_monitor, Point};
use tracing::trace;

/// Reads the color under a point from whichever monitor contains it.
pub struct ScreenSampler<'a> {
    screens: &'a dyn ScreenSource,
}

impl<'a> ScreenSampler<'a> {
    pub fn new(screens: &'a dyn ScreenSource) -> Self {
        Self { screens }
    }

    /// Sample the pixel under `point` (desktop coordinates).
    pub fn sample(&self, point: Point) -> PickerResult<ColorSample> {
        let monitors = self.screens.monitors();
        let monitor = find_monitor(&monitors, point).ok_or(PickerError::NotFound)?;
        let rect = monitor.pixel_rect(point);
        let image = self.screens.capture(monitor, rect)?;
        let color = image.first_pixel_color()?;
        trace!(x = point.x, y = point.y, %color, monitor = monitor.id, "sampled");
        Ok(ColorSample {
            color,
            position: point,
            screen_id: monitor.id,
        })
    }
}
