//! Stand-in surface for platforms without a native overlay.

use pipette_core::{IndicatorStyle, Monitor, OverlaySurface, Point, Rgb};
use tracing::{info, trace};

pub struct HeadlessSurface {
    monitor_id: u32,
    presented: u64,
}

impl HeadlessSurface {
    pub fn new(monitor: &Monitor, style: IndicatorStyle) -> Self {
        info!(
            monitor = monitor.id,
            diameter = style.diameter,
            "no native overlay on this platform, indicator is not drawn"
        );
        Self {
            monitor_id: monitor.id,
            presented: 0,
        }
    }
}

impl OverlaySurface for HeadlessSurface {
    fn present(&mut self, center: Point, stroke: Rgb) {
        self.presented += 1;
        trace!(monitor = self.monitor_id, x = center.x, y = center.y, %stroke, "indicator");
    }

    fn close(&mut self) {
        info!(monitor = self.monitor_id, frames = self.presented, "headless overlay closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipette_core::Rect;

    #[test]
    fn test_counts_frames() {
        let monitor = Monitor {
            id: 1,
            frame: Rect::new(0.0, 0.0, 100.0, 100.0),
            scale_factor: 1.0,
            refresh_hz: 60.0,
        };
        let mut surface = HeadlessSurface::new(&monitor, IndicatorStyle::default());
        surface.present(Point::new(1.0, 2.0), Rgb::new(0, 0, 0));
        surface.present(Point::new(3.0, 4.0), Rgb::new(0, 0, 0));
        assert_eq!(surface.presented, 2);
        surface.close();
    }
}
