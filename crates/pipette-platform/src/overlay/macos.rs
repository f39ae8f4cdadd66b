//! macOS overlay: one borderless, transparent, click-through window per
//! session, covering the monitor, with a view that strokes the ring.
//!
//! The engine thread does not run `NSApplication::run`, so each frame is
//! drawn synchronously with `display` and flushed explicitly, and pending
//! AppKit events are drained between frames.

#![allow(unexpected_cfgs)]

use crate::{PlatformError, PlatformResult};
use cocoa::appkit::{
    NSApp, NSApplication, NSApplicationActivationPolicy, NSBackingStoreType, NSColor, NSWindow,
    NSWindowCollectionBehavior, NSWindowStyleMask,
};
use cocoa::base::{id, nil, NO, YES};
use cocoa::foundation::{NSPoint, NSRect, NSSize, NSString};
use objc::declare::ClassDecl;
use objc::runtime::{Class, Object, Sel};
use objc::{class, msg_send, sel, sel_impl};
use pipette_core::{IndicatorStyle, Monitor, OverlaySurface, Point, Rgb};
use std::sync::Once;
use tracing::{debug, warn};

const VIEW_CLASS: &str = "PipetteRingView";

/// Just above pop-up menus and the Dock.
const OVERLAY_WINDOW_LEVEL: i64 = 202;

static PREPARE: Once = Once::new();

/// Run once before the first window: no Dock icon, no menu bar.
pub fn prepare_application() {
    PREPARE.call_once(|| unsafe {
        let app = NSApp();
        app.setActivationPolicy_(
            NSApplicationActivationPolicy::NSApplicationActivationPolicyAccessory,
        );
    });
}

extern "C" fn draw_rect(this: &Object, _cmd: Sel, _rect: NSRect) {
    unsafe {
        if !*this.get_ivar::<bool>("_visible") {
            return;
        }
        let cx = *this.get_ivar::<f64>("_centerX");
        let cy = *this.get_ivar::<f64>("_centerY");
        let diameter = *this.get_ivar::<f64>("_diameter");
        let stroke_width = *this.get_ivar::<f64>("_strokeWidth");
        let r = *this.get_ivar::<f64>("_strokeR");
        let g = *this.get_ivar::<f64>("_strokeG");
        let b = *this.get_ivar::<f64>("_strokeB");

        let radius = diameter / 2.0;
        let oval = NSRect::new(
            NSPoint::new(cx - radius, cy - radius),
            NSSize::new(diameter, diameter),
        );
        let circle: id = msg_send![class!(NSBezierPath), bezierPathWithOvalInRect: oval];
        let stroke: id = msg_send![class!(NSColor), colorWithSRGBRed: r green: g blue: b alpha: 1.0];
        let _: () = msg_send![stroke, set];
        let _: () = msg_send![circle, setLineWidth: stroke_width];
        let _: () = msg_send![circle, stroke];
    }
}

fn view_class() -> PlatformResult<&'static Class> {
    if let Some(cls) = Class::get(VIEW_CLASS) {
        return Ok(cls);
    }
    let superclass =
        Class::get("NSView").ok_or_else(|| PlatformError::Window("NSView missing".into()))?;
    let mut decl = ClassDecl::new(VIEW_CLASS, superclass)
        .ok_or_else(|| PlatformError::Window(format!("cannot declare {VIEW_CLASS}")))?;

    decl.add_ivar::<bool>("_visible");
    decl.add_ivar::<f64>("_centerX");
    decl.add_ivar::<f64>("_centerY");
    decl.add_ivar::<f64>("_diameter");
    decl.add_ivar::<f64>("_strokeWidth");
    decl.add_ivar::<f64>("_strokeR");
    decl.add_ivar::<f64>("_strokeG");
    decl.add_ivar::<f64>("_strokeB");
    unsafe {
        decl.add_method(sel!(drawRect:), draw_rect as extern "C" fn(&Object, Sel, NSRect));
    }
    Ok(decl.register())
}

/// Pump AppKit events that arrived since the last frame.
unsafe fn drain_events() {
    let app = NSApp();
    let mode = NSString::alloc(nil).init_str("kCFRunLoopDefaultMode");
    let past: id = msg_send![class!(NSDate), distantPast];
    loop {
        let event: id = msg_send![app, nextEventMatchingMask: u64::MAX
                                  untilDate: past
                                  inMode: mode
                                  dequeue: YES];
        if event == nil {
            break;
        }
        let _: () = msg_send![app, sendEvent: event];
    }
    let _: () = msg_send![mode, release];
}

pub struct RingWindow {
    window: id,
    view: id,
    monitor_id: u32,
}

impl RingWindow {
    pub fn create(monitor: &Monitor, style: IndicatorStyle) -> PlatformResult<Self> {
        let cls = view_class()?;
        let frame = NSRect::new(
            NSPoint::new(monitor.frame.x, monitor.frame.y),
            NSSize::new(monitor.frame.width, monitor.frame.height),
        );

        unsafe {
            let window = NSWindow::alloc(nil).initWithContentRect_styleMask_backing_defer_(
                frame,
                NSWindowStyleMask::NSBorderlessWindowMask,
                NSBackingStoreType::NSBackingStoreBuffered,
                NO,
            );
            if window == nil {
                return Err(PlatformError::Window("NSWindow init returned nil".into()));
            }
            window.setOpaque_(NO);
            window.setBackgroundColor_(NSColor::clearColor(nil));
            window.setIgnoresMouseEvents_(YES);
            let _: () = msg_send![window, setHasShadow: NO];
            window.setLevel_(OVERLAY_WINDOW_LEVEL);
            window.setCollectionBehavior_(
                NSWindowCollectionBehavior::NSWindowCollectionBehaviorCanJoinAllSpaces
                    | NSWindowCollectionBehavior::NSWindowCollectionBehaviorFullScreenAuxiliary
                    | NSWindowCollectionBehavior::NSWindowCollectionBehaviorStationary,
            );

            let view: id = msg_send![cls, alloc];
            let bounds = NSRect::new(NSPoint::new(0.0, 0.0), frame.size);
            let view: id = msg_send![view, initWithFrame: bounds];
            if view == nil {
                let _: () = msg_send![window, close];
                return Err(PlatformError::Window("ring view init returned nil".into()));
            }
            (*view).set_ivar::<bool>("_visible", false);
            (*view).set_ivar::<f64>("_centerX", 0.0);
            (*view).set_ivar::<f64>("_centerY", 0.0);
            (*view).set_ivar::<f64>("_diameter", style.diameter);
            (*view).set_ivar::<f64>("_strokeWidth", style.stroke_width);
            (*view).set_ivar::<f64>("_strokeR", 0.0);
            (*view).set_ivar::<f64>("_strokeG", 0.0);
            (*view).set_ivar::<f64>("_strokeB", 0.0);

            let _: () = msg_send![window, setContentView: view];
            // The window retains its content view.
            let _: () = msg_send![view, release];
            let _: () = msg_send![window, orderFrontRegardless];

            debug!(monitor = monitor.id, "overlay window shown");
            Ok(Self {
                window,
                view,
                monitor_id: monitor.id,
            })
        }
    }
}

impl OverlaySurface for RingWindow {
    fn present(&mut self, center: Point, stroke: Rgb) {
        if self.window == nil {
            return;
        }
        unsafe {
            let view = &mut *self.view;
            view.set_ivar::<bool>("_visible", true);
            view.set_ivar::<f64>("_centerX", center.x);
            view.set_ivar::<f64>("_centerY", center.y);
            view.set_ivar::<f64>("_strokeR", f64::from(stroke.r) / 255.0);
            view.set_ivar::<f64>("_strokeG", f64::from(stroke.g) / 255.0);
            view.set_ivar::<f64>("_strokeB", f64::from(stroke.b) / 255.0);

            let _: () = msg_send![self.view, setNeedsDisplay: YES];
            let _: () = msg_send![self.view, displayIfNeeded];
            let _: () = msg_send![class!(CATransaction), flush];
            drain_events();
        }
    }

    fn close(&mut self) {
        if self.window == nil {
            warn!(monitor = self.monitor_id, "overlay window already closed");
            return;
        }
        unsafe {
            let _: () = msg_send![self.window, orderOut: nil];
            // Released on close.
            let _: () = msg_send![self.window, close];
        }
        self.window = nil;
        self.view = nil;
        debug!(monitor = self.monitor_id, "overlay window closed");
    }
}
