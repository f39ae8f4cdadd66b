//! The on-screen indicator: a ring drawn on a transparent, click-through,
//! topmost surface covering one monitor.
//!
//! `OverlayRenderer` owns the surface and does the coordinate conversion and
//! stroke coloring; platform surfaces only place and tint the ring.

use crate::color::Rgb;
use crate::error::PickerResult;
use crate::geometry::{Monitor, Point};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Ring geometry, in logical points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorStyle {
    pub diameter: f64,
    pub stroke_width: f64,
}

impl Default for IndicatorStyle {
    fn default() -> Self {
        Self {
            diameter: 24.0,
            stroke_width: 3.0,
        }
    }
}

/// A platform surface showing the indicator ring.
pub trait OverlaySurface {
    /// Move the ring center to `center` (surface-local, bottom-left origin)
    /// and set its stroke color. Both changes must land in the same frame.
    fn present(&mut self, center: Point, stroke: Rgb);

    /// Release the window and drawing resources.
    fn close(&mut self);
}

/// Creates overlay surfaces on demand.
pub trait SurfaceFactory {
    fn create_surface(
        &mut self,
        monitor: &Monitor,
        style: IndicatorStyle,
    ) -> PickerResult<Box<dyn OverlaySurface>>;
}

/// Owns one overlay surface for the lifetime of a tracking session.
pub struct OverlayRenderer {
    monitor: Monitor,
    surface: Option<Box<dyn OverlaySurface>>,
}

impl OverlayRenderer {
    /// Allocate a surface sized to `on_screen`.
    pub fn create(
        factory: &mut dyn SurfaceFactory,
        on_screen: &Monitor,
        style: IndicatorStyle,
    ) -> PickerResult<Self> {
        let surface = factory.create_surface(on_screen, style)?;
        debug!(monitor = on_screen.id, "overlay created");
        Ok(Self {
            monitor: on_screen.clone(),
            surface: Some(surface),
        })
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Reposition and recolor the indicator. No-op once destroyed.
    pub fn update(&mut self, position: Point, color: Rgb) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let local = self.monitor.to_surface_space(position);
        trace!(x = local.x, y = local.y, %color, "overlay update");
        surface.present(local, color.indicator_stroke());
    }

    /// Release the surface. Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.close();
            debug!(monitor = self.monitor.id, "overlay destroyed");
        }
    }
}

impl Drop for OverlayRenderer {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Rasterize the ring into a square alpha mask for surfaces that blit
/// pixels instead of drawing vector shapes.
///
/// Returns the side length in pixels and one alpha byte per pixel,
/// row-major. The stroke is centered on the circle of the given diameter.
pub fn ring_alpha_mask(diameter: f64, stroke_width: f64) -> (u32, Vec<u8>) {
    let side = (diameter + stroke_width).ceil().max(1.0) as u32;
    let center = f64::from(side) / 2.0;
    let radius = diameter / 2.0;
    let half_stroke = stroke_width / 2.0;

    let mut mask = Vec::with_capacity((side * side) as usize);
    for py in 0..side {
        for px in 0..side {
            let dx = f64::from(px) + 0.5 - center;
            let dy = f64::from(py) + 0.5 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            let on_stroke = (dist - radius).abs() <= half_stroke;
            mask.push(if on_stroke { 255 } else { 0 });
        }
    }
    (side, mask)
}
