//! Windows/Linux display list via the `screenshots` crate.

use super::RawDisplay;
use crate::{PlatformError, PlatformResult};
use screenshots::Screen;

/// Every display, paired with the `Screen` used to capture from it.
pub fn displays() -> PlatformResult<Vec<(RawDisplay, Screen)>> {
    let screens = Screen::all().map_err(|e| PlatformError::Capture(e.to_string()))?;
    Ok(screens
        .into_iter()
        .map(|screen| {
            let info = screen.display_info;
            let display = RawDisplay {
                id: info.id,
                x: f64::from(info.x),
                y: f64::from(info.y),
                width: f64::from(info.width),
                height: f64::from(info.height),
                scale_factor: f64::from(info.scale_factor),
                // Not reported here; the configured fallback rate applies.
                refresh_hz: 0.0,
                is_primary: info.is_primary,
            };
            (display, screen)
        })
        .collect())
}
