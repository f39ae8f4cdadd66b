//! Global keyboard listening for the save hotkey.
//!
//! The listener forwards key-down events, each carrying the modifiers held
//! at the time, to a callback. Only the chord matters here, so key-up events
//! are consumed internally to track modifier state and never forwarded.
//!
//! Platform implementations:
//! - macOS: `CGEventTap` on a dedicated run-loop thread (`macos.rs`)
//! - Windows/Linux: `rdev::listen` (`rdev_impl.rs`)

use crate::PlatformResult;
use pipette_core::{KeyEvent, Modifier, ModifierSet};

#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(target_os = "macos"))]
mod rdev_impl;

// CGEventFlags bits for the modifiers a chord may use.
const FLAG_SHIFT: u64 = 0x0002_0000;
const FLAG_CONTROL: u64 = 0x0004_0000;
const FLAG_ALTERNATE: u64 = 0x0008_0000;
const FLAG_COMMAND: u64 = 0x0010_0000;

/// Modifiers encoded in a Core Graphics event flag word.
pub fn modifiers_from_flags(flags: u64) -> ModifierSet {
    [
        (FLAG_COMMAND, Modifier::Cmd),
        (FLAG_ALTERNATE, Modifier::Option),
        (FLAG_CONTROL, Modifier::Ctrl),
        (FLAG_SHIFT, Modifier::Shift),
    ]
    .into_iter()
    .filter(|(bit, _)| flags & bit != 0)
    .map(|(_, m)| m)
    .collect()
}

/// The modifier a named key stands for, if any.
pub fn modifier_for_key(name: &str) -> Option<Modifier> {
    match name {
        "MetaLeft" | "MetaRight" => Some(Modifier::Cmd),
        "Alt" | "AltGr" => Some(Modifier::Option),
        "ControlLeft" | "ControlRight" => Some(Modifier::Ctrl),
        "ShiftLeft" | "ShiftRight" => Some(Modifier::Shift),
        _ => None,
    }
}

/// Modifier state rebuilt from individual press and release events, for
/// backends that do not report flags with each key.
///
/// Left and right variants are tracked separately so releasing one side
/// keeps the modifier active while the other is still held.
#[derive(Debug, Default)]
pub struct ModifierTracker {
    held: Vec<&'static str>,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press. Returns the event to forward, or `None` when the
    /// key is itself a modifier.
    pub fn press(&mut self, key: &str) -> Option<KeyEvent> {
        if let Some(name) = Self::modifier_key_name(key) {
            if !self.held.contains(&name) {
                self.held.push(name);
            }
            return None;
        }
        Some(KeyEvent::new(self.modifiers(), key))
    }

    pub fn release(&mut self, key: &str) {
        self.held.retain(|held| *held != key);
    }

    pub fn modifiers(&self) -> ModifierSet {
        self.held.iter().filter_map(|k| modifier_for_key(k)).collect()
    }

    fn modifier_key_name(key: &str) -> Option<&'static str> {
        const NAMES: [&str; 8] = [
            "MetaLeft",
            "MetaRight",
            "Alt",
            "AltGr",
            "ControlLeft",
            "ControlRight",
            "ShiftLeft",
            "ShiftRight",
        ];
        NAMES.into_iter().find(|n| *n == key)
    }
}

/// A running global keyboard listener.
///
/// The OS hooks used here cannot be torn down from another thread, so the
/// listener lives until the process exits.
pub struct KeyboardListener {
    _thread: std::thread::JoinHandle<()>,
}

impl KeyboardListener {
    /// Start listening. `on_key` runs on the listener thread and must not
    /// block.
    pub fn start<F>(on_key: F) -> PlatformResult<Self>
    where
        F: Fn(KeyEvent) + Send + 'static,
    {
        #[cfg(target_os = "macos")]
        let thread = macos::spawn(on_key)?;

        #[cfg(not(target_os = "macos"))]
        let thread = rdev_impl::spawn(on_key)?;

        Ok(Self { _thread: thread })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_from_flags() {
        assert!(modifiers_from_flags(0).is_empty());
        let set = modifiers_from_flags(FLAG_COMMAND | FLAG_SHIFT | 0x100);
        assert_eq!(
            set,
            ModifierSet::empty().with(Modifier::Cmd).with(Modifier::Shift)
        );
        let set = modifiers_from_flags(FLAG_CONTROL | FLAG_ALTERNATE);
        assert!(set.contains(Modifier::Ctrl));
        assert!(set.contains(Modifier::Option));
        assert!(!set.contains(Modifier::Cmd));
    }

    #[test]
    fn test_tracker_attaches_held_modifiers() {
        let mut tracker = ModifierTracker::new();
        assert_eq!(tracker.press("MetaLeft"), None);
        assert_eq!(tracker.press("ShiftRight"), None);

        let event = tracker.press("c").unwrap();
        assert_eq!(
            event,
            KeyEvent::new(
                ModifierSet::empty().with(Modifier::Cmd).with(Modifier::Shift),
                "c"
            )
        );

        tracker.release("ShiftRight");
        assert_eq!(tracker.press("c").unwrap().modifiers, ModifierSet::empty().with(Modifier::Cmd));
    }

    #[test]
    fn test_tracker_keeps_modifier_while_other_side_held() {
        let mut tracker = ModifierTracker::new();
        tracker.press("ShiftLeft");
        tracker.press("ShiftRight");
        tracker.press("ShiftLeft");
        tracker.release("ShiftLeft");
        assert!(tracker.modifiers().contains(Modifier::Shift));
        tracker.release("ShiftRight");
        assert!(tracker.modifiers().is_empty());
    }

    #[test]
    fn test_tracker_output_matches_chord() {
        let chord = pipette_core::HotkeyChord::parse("Cmd + Shift + C").unwrap();
        let mut tracker = ModifierTracker::new();
        tracker.press("MetaLeft");
        tracker.press("ShiftLeft");
        let event = tracker.press("c").unwrap();
        assert!(chord.is_triggered_by(&event));
    }
}
