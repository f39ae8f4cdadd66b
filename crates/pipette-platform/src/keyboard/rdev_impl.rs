//! rdev-based keyboard listening for Windows/Linux.

use super::ModifierTracker;
use crate::{PlatformError, PlatformResult};
use pipette_core::KeyEvent;
use rdev::{listen, Event, EventType, Key};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

pub fn spawn<F>(on_key: F) -> PlatformResult<JoinHandle<()>>
where
    F: Fn(KeyEvent) + Send + 'static,
{
    thread::Builder::new()
        .name("pipette-keyboard".into())
        .spawn(move || {
            info!("keyboard listener started (rdev)");
            let mut tracker = ModifierTracker::new();
            let callback = move |event: Event| match event.event_type {
                EventType::KeyPress(key) => {
                    if let Some(key_event) = tracker.press(&format_key(key)) {
                        on_key(key_event);
                    }
                }
                EventType::KeyRelease(key) => tracker.release(&format_key(key)),
                _ => {}
            };
            if let Err(e) = listen(callback) {
                error!(error = ?e, "keyboard hook failed");
            }
            info!("keyboard listener thread exiting");
        })
        .map_err(|e| PlatformError::Keyboard(e.to_string()))
}

/// Key name as used in chords and by [`ModifierTracker`].
fn format_key(key: Key) -> String {
    let name = match key {
        Key::Alt => "Alt",
        Key::AltGr => "AltGr",
        Key::ControlLeft => "ControlLeft",
        Key::ControlRight => "ControlRight",
        Key::MetaLeft => "MetaLeft",
        Key::MetaRight => "MetaRight",
        Key::ShiftLeft => "ShiftLeft",
        Key::ShiftRight => "ShiftRight",
        Key::Backspace => "Backspace",
        Key::Delete => "Delete",
        Key::Escape => "Escape",
        Key::Return => "Return",
        Key::Space => "Space",
        Key::Tab => "Tab",
        Key::BackQuote => "`",
        Key::Num1 => "1",
        Key::Num2 => "2",
        Key::Num3 => "3",
        Key::Num4 => "4",
        Key::Num5 => "5",
        Key::Num6 => "6",
        Key::Num7 => "7",
        Key::Num8 => "8",
        Key::Num9 => "9",
        Key::Num0 => "0",
        Key::Minus => "-",
        Key::Equal => "=",
        Key::KeyQ => "q",
        Key::KeyW => "w",
        Key::KeyE => "e",
        Key::KeyR => "r",
        Key::KeyT => "t",
        Key::KeyY => "y",
        Key::KeyU => "u",
        Key::KeyI => "i",
        Key::KeyO => "o",
        Key::KeyP => "p",
        Key::LeftBracket => "[",
        Key::RightBracket => "]",
        Key::KeyA => "a",
        Key::KeyS => "s",
        Key::KeyD => "d",
        Key::KeyF => "f",
        Key::KeyG => "g",
        Key::KeyH => "h",
        Key::KeyJ => "j",
        Key::KeyK => "k",
        Key::KeyL => "l",
        Key::SemiColon => ";",
        Key::Quote => "'",
        Key::BackSlash | Key::IntlBackslash => "\\",
        Key::KeyZ => "z",
        Key::KeyX => "x",
        Key::KeyC => "c",
        Key::KeyV => "v",
        Key::KeyB => "b",
        Key::KeyN => "n",
        Key::KeyM => "m",
        Key::Comma => ",",
        Key::Dot => ".",
        Key::Slash => "/",
        Key::Unknown(code) => return format!("Unknown({})", code),
        other => return format!("{:?}", other),
    };
    name.to_string()
}
