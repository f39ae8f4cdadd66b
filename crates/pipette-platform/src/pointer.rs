//! Pointer location in desktop coordinates (bottom-left origin).
//!
//! Platform implementations:
//! - macOS: `NSEvent.mouseLocation`, already in desktop space
//! - Windows/Linux: `enigo` location, flipped against the primary monitor

use pipette_core::{Point, PointerSource};

#[cfg(target_os = "macos")]
pub use macos::CocoaPointer as DesktopPointer;

#[cfg(not(target_os = "macos"))]
pub use enigo_impl::EnigoPointer as DesktopPointer;

#[cfg(target_os = "macos")]
mod macos {
    #![allow(unexpected_cfgs)]

    use super::*;
    use crate::display::MonitorCache;
    use crate::PlatformResult;
    use cocoa::foundation::NSPoint;
    use objc::{class, msg_send, sel, sel_impl};
    use std::rc::Rc;

    pub struct CocoaPointer;

    impl CocoaPointer {
        pub fn new(_monitors: Rc<MonitorCache>) -> PlatformResult<Self> {
            Ok(Self)
        }
    }

    impl PointerSource for CocoaPointer {
        fn pointer_location(&self) -> Option<Point> {
            let p: NSPoint = unsafe { msg_send![class!(NSEvent), mouseLocation] };
            Some(Point::new(p.x, p.y))
        }
    }
}

#[cfg(not(target_os = "macos"))]
mod enigo_impl {
    use super::*;
    use crate::display::MonitorCache;
    use crate::dpi::{primary_scale_factor, to_logical};
    use crate::{PlatformError, PlatformResult};
    use enigo::{Enigo, Mouse, Settings};
    use std::rc::Rc;
    use tracing::debug;

    pub struct EnigoPointer {
        enigo: Enigo,
        monitors: Rc<MonitorCache>,
        scale_factor: f64,
    }

    impl EnigoPointer {
        pub fn new(monitors: Rc<MonitorCache>) -> PlatformResult<Self> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| PlatformError::Pointer(e.to_string()))?;
            Ok(Self {
                enigo,
                monitors,
                scale_factor: primary_scale_factor(),
            })
        }
    }

    impl PointerSource for EnigoPointer {
        fn pointer_location(&self) -> Option<Point> {
            let (px, py) = match self.enigo.location() {
                Ok(loc) => loc,
                Err(e) => {
                    debug!(error = %e, "pointer location unavailable");
                    return None;
                }
            };
            let (x, y) = to_logical(px, py, self.scale_factor);
            let primary_height = self.monitors.primary_height()?;
            Some(Point::from_top_left(x, y, primary_height))
        }
    }
}
