//! Windows/Linux capture via the `screenshots` crate.
//!
//! The framebuffer on these platforms is treated as sRGB.

use crate::{PlatformError, PlatformResult};
use pipette_core::{CaptureRect, CapturedImage, ColorProfile};
use screenshots::Screen;

pub fn capture(screen: &Screen, rect: CaptureRect) -> PlatformResult<CapturedImage> {
    let image = screen
        .capture_area(rect.x, rect.y, rect.width, rect.height)
        .map_err(|e| PlatformError::Capture(e.to_string()))?;

    let (width, height) = (image.width(), image.height());
    CapturedImage::from_rgba(width, height, image.into_raw(), ColorProfile::Srgb)
        .ok_or(PlatformError::NoPixelData)
}
