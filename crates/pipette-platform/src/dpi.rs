//! DPI awareness and physical-to-logical pointer conversion.
//!
//! On Windows the process opts into Per-Monitor V2 awareness so the
//! overlay can be placed in physical pixels; pointer positions then arrive
//! physical and are scaled back to the logical points monitors are
//! described in. Other platforms already report logical coordinates.

#[cfg(target_os = "windows")]
mod windows_dpi {
    use std::sync::Once;
    use tracing::{info, warn};

    static INIT: Once = Once::new();

    /// Must run before the first window is created.
    pub fn set_dpi_aware() {
        INIT.call_once(|| unsafe {
            const DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2: isize = -4;

            #[link(name = "user32")]
            extern "system" {
                fn SetProcessDpiAwarenessContext(value: isize) -> i32;
            }

            if SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) != 0 {
                info!("per-monitor v2 DPI awareness enabled");
            } else {
                warn!("failed to set per-monitor v2 DPI awareness, coordinates may be scaled");
            }
        });
    }

    pub fn primary_scale_factor() -> f64 {
        #[link(name = "user32")]
        extern "system" {
            fn GetDpiForSystem() -> u32;
        }
        let dpi = unsafe { GetDpiForSystem() };
        f64::from(dpi) / 96.0
    }
}

#[cfg(target_os = "windows")]
pub use windows_dpi::*;

#[cfg(not(target_os = "windows"))]
mod other_dpi {
    pub fn set_dpi_aware() {}

    pub fn primary_scale_factor() -> f64 {
        1.0
    }
}

#[cfg(not(target_os = "windows"))]
pub use other_dpi::*;

/// Scale a physical pixel position down to logical points.
pub fn to_logical(physical_x: i32, physical_y: i32, scale_factor: f64) -> (f64, f64) {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    (f64::from(physical_x) / scale, f64::from(physical_y) / scale)
}
