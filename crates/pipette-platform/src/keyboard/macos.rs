//! macOS keyboard listening through a listen-only `CGEventTap`.
//!
//! rdev resolves characters with TSMGetInputSourceProperty, which must run
//! on the main thread, so the tap is driven directly and keycodes are
//! mapped to names here. Modifier state comes from the event flags.

use super::modifiers_from_flags;
use crate::{PlatformError, PlatformResult};
use core_foundation::base::TCFType;
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop, CFRunLoopSource};
use core_graphics::event::{CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType};
use crossbeam_channel::bounded;
use pipette_core::KeyEvent;
use std::cell::RefCell;
use std::ffi::c_void;
use std::ptr;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

type CFMachPortRef = *mut c_void;
type CFRunLoopSourceRef = *mut c_void;
type CFAllocatorRef = *const c_void;
type CFIndex = i64;
type CGEventRef = *mut c_void;
type CGEventFlags = u64;

const KEYBOARD_EVENT_KEYCODE: u32 = 9;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: CGEventTapCallback,
        user_info: *mut c_void,
    ) -> CFMachPortRef;

    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
    fn CGEventGetFlags(event: CGEventRef) -> CGEventFlags;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(
        allocator: CFAllocatorRef,
        port: CFMachPortRef,
        order: CFIndex,
    ) -> CFRunLoopSourceRef;
}

type CGEventTapCallback = extern "C" fn(
    proxy: *mut c_void,
    event_type: CGEventType,
    cg_event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef;

type KeyCallback = Box<dyn Fn(KeyEvent)>;

thread_local! {
    static ON_KEY: RefCell<Option<KeyCallback>> = const { RefCell::new(None) };
}

extern "C" fn event_tap_callback(
    _proxy: *mut c_void,
    event_type: CGEventType,
    cg_event: CGEventRef,
    _user_info: *mut c_void,
) -> CGEventRef {
    if let CGEventType::KeyDown = event_type {
        let keycode = unsafe { CGEventGetIntegerValueField(cg_event, KEYBOARD_EVENT_KEYCODE) } as u16;
        let flags = unsafe { CGEventGetFlags(cg_event) };
        let event = KeyEvent::new(modifiers_from_flags(flags), keycode_to_name(keycode));
        ON_KEY.with(|cb| {
            if let Some(cb) = cb.borrow().as_ref() {
                cb(event);
            }
        });
    }
    // Listen-only: hand the event back unchanged.
    cg_event
}

/// Spawn the tap thread. Returns once the tap is installed or has failed.
pub fn spawn<F>(on_key: F) -> PlatformResult<JoinHandle<()>>
where
    F: Fn(KeyEvent) + Send + 'static,
{
    let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);

    let thread = thread::Builder::new()
        .name("pipette-keyboard".into())
        .spawn(move || {
            ON_KEY.with(|cb| *cb.borrow_mut() = Some(Box::new(on_key)));
            if let Err(e) = run_event_tap(|| {
                let _ = ready_tx.send(Ok(()));
            }) {
                error!(error = %e, "keyboard event tap failed");
                let _ = ready_tx.send(Err(e));
            }
            info!("keyboard listener thread exiting");
        })
        .map_err(|e| PlatformError::Keyboard(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(thread),
        Ok(Err(e)) => Err(PlatformError::Keyboard(e)),
        Err(_) => Err(PlatformError::Keyboard("listener thread exited".into())),
    }
}

fn run_event_tap(on_ready: impl FnOnce()) -> Result<(), String> {
    // FlagsChanged is not needed: KeyDown carries the current flags.
    let event_mask: u64 = 1 << CGEventType::KeyDown as u64;

    let tap = unsafe {
        CGEventTapCreate(
            CGEventTapLocation::HID as u32,
            CGEventTapPlacement::HeadInsertEventTap as u32,
            CGEventTapOptions::ListenOnly as u32,
            event_mask,
            event_tap_callback,
            ptr::null_mut(),
        )
    };
    if tap.is_null() {
        return Err("failed to create event tap (input monitoring permission?)".to_string());
    }
    debug!("keyboard event tap created");

    let run_loop_source = unsafe { CFMachPortCreateRunLoopSource(ptr::null(), tap, 0) };
    if run_loop_source.is_null() {
        return Err("failed to create run loop source".to_string());
    }
    let cf_source = unsafe { CFRunLoopSource::wrap_under_create_rule(run_loop_source as *mut _) };

    let run_loop = CFRunLoop::get_current();
    run_loop.add_source(&cf_source, unsafe { kCFRunLoopCommonModes });
    unsafe { CGEventTapEnable(tap, true) };

    info!("keyboard listener started");
    on_ready();
    CFRunLoop::run_current();
    Ok(())
}

/// Map a macOS virtual keycode to the key name used in chords.
///
/// Only character keys can complete a chord; everything else maps to a
/// descriptive name that never matches.
pub fn keycode_to_name(keycode: u16) -> String {
    let name = match keycode {
        0x00 => "a",
        0x01 => "s",
        0x02 => "d",
        0x03 => "f",
        0x04 => "h",
        0x05 => "g",
        0x06 => "z",
        0x07 => "x",
        0x08 => "c",
        0x09 => "v",
        0x0B => "b",
        0x0C => "q",
        0x0D => "w",
        0x0E => "e",
        0x0F => "r",
        0x10 => "y",
        0x11 => "t",
        0x12 => "1",
        0x13 => "2",
        0x14 => "3",
        0x15 => "4",
        0x16 => "6",
        0x17 => "5",
        0x18 => "=",
        0x19 => "9",
        0x1A => "7",
        0x1B => "-",
        0x1C => "8",
        0x1D => "0",
        0x1E => "]",
        0x1F => "o",
        0x20 => "u",
        0x21 => "[",
        0x22 => "i",
        0x23 => "p",
        0x24 => "Return",
        0x25 => "l",
        0x26 => "j",
        0x27 => "'",
        0x28 => "k",
        0x29 => ";",
        0x2A => "\\",
        0x2B => ",",
        0x2C => "/",
        0x2D => "n",
        0x2E => "m",
        0x2F => ".",
        0x30 => "Tab",
        0x31 => "Space",
        0x32 => "`",
        0x33 => "Backspace",
        0x35 => "Escape",
        0x7B => "Left",
        0x7C => "Right",
        0x7D => "Down",
        0x7E => "Up",
        _ => return format!("Unknown(0x{:02X})", keycode),
    };
    name.to_string()
}
