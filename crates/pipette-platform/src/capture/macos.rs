//! macOS capture via Core Graphics.
//!
//! The captured image is in the display's color space. It is redrawn into
//! an sRGB bitmap context so channel values are comparable across
//! displays; if that context cannot be built, raw BGRA bytes are used.

use crate::{PlatformError, PlatformResult};
use core_graphics::base::{kCGBitmapByteOrder32Big, kCGImageAlphaPremultipliedLast};
use core_graphics::color_space::{kCGColorSpaceSRGB, CGColorSpace};
use core_graphics::context::CGContext;
use core_graphics::display::CGDisplay;
use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use core_graphics::image::CGImage;
use pipette_core::{CaptureRect, CapturedImage, ColorProfile};
use tracing::warn;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGPreflightScreenCaptureAccess() -> bool;
}

pub fn preflight_access() -> bool {
    unsafe { CGPreflightScreenCaptureAccess() }
}

pub fn capture(display_id: u32, rect: CaptureRect) -> PlatformResult<CapturedImage> {
    let bounds = CGRect::new(
        &CGPoint::new(f64::from(rect.x), f64::from(rect.y)),
        &CGSize::new(f64::from(rect.width), f64::from(rect.height)),
    );
    let image = CGDisplay::new(display_id)
        .image_for_rect(bounds)
        .ok_or_else(|| PlatformError::Capture("CGDisplayCreateImageForRect returned null".into()))?;

    match redraw_srgb(&image) {
        Some(captured) => Ok(captured),
        None => {
            warn!("sRGB context unavailable, using native pixels");
            native_pixels(&image)
        }
    }
}

fn redraw_srgb(image: &CGImage) -> Option<CapturedImage> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return None;
    }
    let space = unsafe { CGColorSpace::create_with_name(kCGColorSpaceSRGB) }?;
    let mut ctx = CGContext::create_bitmap_context(
        None,
        width,
        height,
        8,
        width * 4,
        &space,
        kCGImageAlphaPremultipliedLast | kCGBitmapByteOrder32Big,
    );
    ctx.draw_image(
        CGRect::new(
            &CGPoint::new(0.0, 0.0),
            &CGSize::new(width as f64, height as f64),
        ),
        image,
    );
    let data = ctx.data().to_vec();
    CapturedImage::from_rgba(width as u32, height as u32, data, ColorProfile::Srgb)
}

fn native_pixels(image: &CGImage) -> PlatformResult<CapturedImage> {
    let (width, height) = (image.width(), image.height());
    let bytes_per_row = image.bytes_per_row();
    let bytes_per_pixel = image.bits_per_pixel() / 8;
    if bytes_per_pixel < 4 {
        return Err(PlatformError::NoPixelData);
    }

    let data = image.data();
    let bytes: &[u8] = &data;
    let mut rgba = Vec::with_capacity(width * height * 4);
    for row in 0..height {
        for col in 0..width {
            let offset = row * bytes_per_row + col * bytes_per_pixel;
            let px = bytes
                .get(offset..offset + 4)
                .ok_or(PlatformError::NoPixelData)?;
            // BGRA in memory.
            rgba.extend_from_slice(&[px[2], px[1], px[0], 255]);
        }
    }
    CapturedImage::from_rgba(width as u32, height as u32, rgba, ColorProfile::Native)
        .ok_or(PlatformError::NoPixelData)
}
