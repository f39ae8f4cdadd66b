//! Color values, captured bitmaps and channel scaling.

use crate::error::{PickerError, PickerResult};
use crate::geometry::Point;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

static NATIVE_PROFILE_WARNED: AtomicBool = AtomicBool::new(false);

/// RGB color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to hex string (e.g., "#FF0000").
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_array(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Stroke color for the on-screen indicator.
    ///
    /// The indicator has always been drawn with red and blue exchanged.
    /// Kept as shipped until product signs off on changing it.
    pub fn indicator_stroke(&self) -> Rgb {
        Rgb::new(self.b, self.g, self.r)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// One sampled pixel. Replaced wholesale on every successful tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    pub color: Rgb,
    pub position: Point,
    pub screen_id: u32,
}

/// Color space of the pixels a capture backend returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorProfile {
    /// Already converted to sRGB.
    Srgb,
    /// The display's native space; conversion to sRGB was not possible.
    Native,
}

/// Widen an 8-bit channel to a `[0, 1]` component.
pub fn channel_component(byte: u8) -> f64 {
    f64::from(byte) / 255.0
}

/// Scale a `[0, 1]` component to an 8-bit channel, truncating.
pub fn scale_channel(component: f64) -> u8 {
    (component.clamp(0.0, 1.0) * 255.0) as u8
}

/// A captured screen region.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pixels: RgbaImage,
    profile: ColorProfile,
}

impl CapturedImage {
    pub fn new(pixels: RgbaImage, profile: ColorProfile) -> Self {
        Self { pixels, profile }
    }

    /// Wrap a tightly packed RGBA8 buffer. Returns `None` when the buffer
    /// length does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>, profile: ColorProfile) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(|pixels| Self { pixels, profile })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn profile(&self) -> ColorProfile {
        self.profile
    }

    /// Decode the top-left pixel into an sRGB color.
    ///
    /// Pixels still in the display's native space are used as-is.
    pub fn first_pixel_color(&self) -> PickerResult<Rgb> {
        if self.pixels.width() == 0 || self.pixels.height() == 0 {
            return Err(PickerError::DecodeFailed);
        }
        let px = self.pixels.get_pixel(0, 0).0;
        if self.profile == ColorProfile::Native && !NATIVE_PROFILE_WARNED.swap(true, Ordering::Relaxed) {
            warn!("sRGB conversion unavailable, using native channel values");
        }
        let [r, g, b] = [px[0], px[1], px[2]].map(|c| scale_channel(channel_component(c)));
        Ok(Rgb::new(r, g, b))
    }

    /// Encode the full region as PNG at its native resolution.
    pub fn encode_png(&self) -> PickerResult<Vec<u8>> {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(
                self.pixels.as_raw(),
                self.pixels.width(),
                self.pixels.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| PickerError::EncodeFailed(e.to_string()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_color_to_hex() {
        assert_eq!(Rgb::new(255, 128, 0).to_hex(), "#FF8000");
    }

    #[test]
    fn test_indicator_stroke_swaps_red_and_blue() {
        assert_eq!(Rgb::new(10, 20, 30).indicator_stroke(), Rgb::new(30, 20, 10));
    }

    #[test]
    fn test_scale_channel_truncates() {
        assert_eq!(scale_channel(1.0), 255);
        assert_eq!(scale_channel(0.0), 0);
        assert_eq!(scale_channel(0.5), 127);
        assert_eq!(scale_channel(0.999), 254);
        assert_eq!(scale_channel(1.5), 255);
        assert_eq!(scale_channel(-0.2), 0);
    }

    #[test]
    fn test_scaling_is_deterministic() {
        let image = CapturedImage::new(
            RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 255])),
            ColorProfile::Srgb,
        );
        let first = image.first_pixel_color().unwrap();
        for _ in 0..10 {
            assert_eq!(image.first_pixel_color().unwrap(), first);
        }
    }

    #[test]
    fn test_first_pixel_pure_red() {
        let image = CapturedImage::new(
            RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255])),
            ColorProfile::Srgb,
        );
        assert_eq!(image.first_pixel_color().unwrap(), Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_native_profile_falls_back_to_raw() {
        let image = CapturedImage::new(
            RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255])),
            ColorProfile::Native,
        );
        assert_eq!(image.first_pixel_color().unwrap(), Rgb::new(0, 255, 0));
        // The fallback is reported once per process.
        assert!(NATIVE_PROFILE_WARNED.load(Ordering::Relaxed));
        assert_eq!(image.first_pixel_color().unwrap(), Rgb::new(0, 255, 0));
    }

    #[test]
    fn test_empty_image_fails_decode() {
        let image = CapturedImage::new(RgbaImage::new(0, 0), ColorProfile::Srgb);
        assert_eq!(image.first_pixel_color(), Err(PickerError::DecodeFailed));
    }

    #[test]
    fn test_from_rgba_rejects_short_buffer() {
        assert!(CapturedImage::from_rgba(2, 2, vec![0; 8], ColorProfile::Srgb).is_none());
        assert!(CapturedImage::from_rgba(2, 2, vec![0; 16], ColorProfile::Srgb).is_some());
    }

    #[test]
    fn test_encode_png_keeps_dimensions() {
        let image = CapturedImage::new(
            RgbaImage::from_pixel(11, 11, Rgba([1, 2, 3, 255])),
            ColorProfile::Srgb,
        );
        let png = image.encode_png().unwrap();
        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (11, 11));
    }
}
