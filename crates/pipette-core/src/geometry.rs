//! Desktop geometry: points, monitor frames and capture-space conversion.
//!
//! Desktop coordinates follow the AppKit convention: one shared space for all
//! monitors, origin at the bottom-left of the primary monitor, y growing up.
//! Capture coordinates are local to one monitor with the origin at its
//! top-left corner, y growing down.

use serde::{Deserialize, Serialize};

/// A point in desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert a top-left-origin point (as reported by most input APIs) into
    /// desktop coordinates, given the height of the primary monitor.
    pub fn from_top_left(x: f64, y: f64, primary_height: f64) -> Self {
        Self {
            x,
            y: primary_height - y,
        }
    }
}

/// An axis-aligned rectangle in desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a desktop rectangle from a top-left-origin rectangle.
    pub fn from_top_left(x: f64, y: f64, width: f64, height: f64, primary_height: f64) -> Self {
        Self {
            x,
            y: primary_height - (y + height),
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Pointer containment in an unflipped space: the left and top edges are
    /// inside, the right and bottom edges are not.
    pub fn contains_pointer(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.max_x() && p.y > self.y && p.y <= self.max_y()
    }
}

/// One physical display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: u32,
    /// Bounds in desktop coordinates (logical points).
    pub frame: Rect,
    /// Backing pixels per logical point.
    pub scale_factor: f64,
    /// Refresh rate reported by the display, 0 when unknown.
    pub refresh_hz: f64,
}

impl Monitor {
    /// Local capture-space coordinates (top-left origin) of a desktop point.
    pub fn to_capture_space(&self, p: Point) -> (f64, f64) {
        let local_x = p.x - self.frame.x;
        let local_y = self.frame.height - (p.y - self.frame.y);
        (local_x, local_y)
    }

    /// Local surface coordinates (bottom-left origin) of a desktop point.
    pub fn to_surface_space(&self, p: Point) -> Point {
        Point::new(p.x - self.frame.x, p.y - self.frame.y)
    }

    /// The 1×1 capture rectangle under a desktop point.
    pub fn pixel_rect(&self, p: Point) -> CaptureRect {
        let (lx, ly) = self.to_capture_space(p);
        let max_x = (self.frame.width as i32 - 1).max(0);
        let max_y = (self.frame.height as i32 - 1).max(0);
        CaptureRect {
            x: (lx.floor() as i32).clamp(0, max_x),
            y: (ly.floor() as i32).clamp(0, max_y),
            width: 1,
            height: 1,
        }
    }
}

/// A capture rectangle local to one monitor, top-left origin, logical points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRect {
    /// Whether the rectangle lies fully inside a monitor of the given size.
    pub fn fits_within(&self, width: f64, height: f64) -> bool {
        self.x >= 0
            && self.y >= 0
            && f64::from(self.x) + f64::from(self.width) <= width
            && f64::from(self.y) + f64::from(self.height) <= height
    }
}

/// First monitor, in list order, whose frame contains the point.
pub fn find_monitor(monitors: &[Monitor], p: Point) -> Option<&Monitor> {
    monitors.iter().find(|m| m.frame.contains_pointer(p))
}
