//! Seams between the engine and the operating system.
//!
//! `pipette-platform` implements these for real desktops; tests use
//! in-memory fakes. Implementations are owned by the engine thread and are
//! never shared across threads.

use crate::color::CapturedImage;
use crate::error::PickerResult;
use crate::geometry::{CaptureRect, Monitor, Point};

/// Monitor layout and screen capture.
pub trait ScreenSource {
    /// Known monitors in a stable order.
    fn monitors(&self) -> Vec<Monitor>;

    /// Capture a rectangle local to `monitor`.
    ///
    /// Fails with `CaptureFailed` when the OS returns no image and with
    /// `DecodeFailed` when the image carries no readable pixel buffer.
    fn capture(&self, monitor: &Monitor, rect: CaptureRect) -> PickerResult<CapturedImage>;
}

/// Current pointer position.
pub trait PointerSource {
    /// Pointer location in desktop coordinates, if it can be read.
    fn pointer_location(&self) -> Option<Point>;
}
