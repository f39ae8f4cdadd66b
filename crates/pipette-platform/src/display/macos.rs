//! macOS display list via Core Graphics.

use super::RawDisplay;
use crate::{PlatformError, PlatformResult};
use core_graphics::display::CGDisplay;

pub fn displays() -> PlatformResult<Vec<RawDisplay>> {
    let ids = CGDisplay::active_displays()
        .map_err(|e| PlatformError::Capture(format!("CGGetActiveDisplayList failed: {e}")))?;

    Ok(ids
        .into_iter()
        .map(|id| {
            let display = CGDisplay::new(id);
            let bounds = display.bounds();
            let (refresh_hz, scale_factor) = match display.display_mode() {
                Some(mode) if mode.width() > 0 => (
                    mode.refresh_rate(),
                    mode.pixel_width() as f64 / mode.width() as f64,
                ),
                Some(mode) => (mode.refresh_rate(), 1.0),
                None => (0.0, 1.0),
            };
            RawDisplay {
                id,
                x: bounds.origin.x,
                y: bounds.origin.y,
                width: bounds.size.width,
                height: bounds.size.height,
                scale_factor,
                refresh_hz,
                is_primary: display.is_main(),
            }
        })
        .collect())
}
