//! Hotkey chords: parsing, normalization and matching against live key events.
//!
//! A chord is written as tokens joined by `" + "`, e.g. `"Cmd + Shift + L"`.
//! Modifier names are case-insensitive and accept a few platform aliases;
//! the single primary key is stored uppercased.

use crate::error::{PickerError, PickerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chord used when nothing else is configured.
pub const DEFAULT_HOTKEY: &str = "Cmd + Shift + C";

/// Modifier keys recognized in chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Cmd,
    Option,
    Ctrl,
    Shift,
}

impl Modifier {
    const ALL: [Modifier; 4] = [Modifier::Cmd, Modifier::Option, Modifier::Ctrl, Modifier::Shift];

    fn bit(self) -> u8 {
        match self {
            Modifier::Cmd => 1,
            Modifier::Option => 1 << 1,
            Modifier::Ctrl => 1 << 2,
            Modifier::Shift => 1 << 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modifier::Cmd => "Cmd",
            Modifier::Option => "Option",
            Modifier::Ctrl => "Ctrl",
            Modifier::Shift => "Shift",
        }
    }

    /// Parse a modifier token, accepting common aliases.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "cmd" | "command" | "meta" | "super" | "win" => Some(Modifier::Cmd),
            "option" | "opt" | "alt" => Some(Modifier::Option),
            "ctrl" | "control" => Some(Modifier::Ctrl),
            "shift" => Some(Modifier::Shift),
            _ => None,
        }
    }
}

/// An unordered set of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierSet(u8);

impl ModifierSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        self.insert(modifier);
        self
    }

    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Modifiers in canonical display order.
    pub fn iter(&self) -> impl Iterator<Item = Modifier> {
        let set = *self;
        Modifier::ALL.into_iter().filter(move |m| set.contains(*m))
    }
}

impl FromIterator<Modifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut set = ModifierSet::empty();
        for m in iter {
            set.insert(m);
        }
        set
    }
}

/// A modifier set plus exactly one primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyChord {
    pub modifiers: ModifierSet,
    pub key: char,
}

impl HotkeyChord {
    pub fn new(modifiers: ModifierSet, key: char) -> Self {
        Self {
            modifiers,
            key: normalize_key_char(key),
        }
    }

    /// Parse a `" + "`-joined chord string.
    pub fn parse(input: &str) -> PickerResult<Self> {
        let mut modifiers = ModifierSet::empty();
        let mut key: Option<char> = None;

        for raw in input.split('+') {
            let token = raw.trim();
            if token.is_empty() {
                return Err(PickerError::InvalidChord(format!("empty token in {input:?}")));
            }
            if let Some(modifier) = Modifier::from_token(token) {
                modifiers.insert(modifier);
                continue;
            }
            let mut chars = token.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return Err(PickerError::InvalidChord(format!(
                    "key {token:?} is not a single character"
                )));
            };
            if key.replace(c).is_some() {
                return Err(PickerError::InvalidChord(format!(
                    "more than one key in {input:?}"
                )));
            }
        }

        let key = key.ok_or_else(|| PickerError::InvalidChord(format!("no key in {input:?}")))?;
        Ok(Self::new(modifiers, key))
    }

    /// Whether a live key-down event triggers this chord.
    pub fn is_triggered_by(&self, event: &KeyEvent) -> bool {
        matches(event.modifiers, &event.key, self)
    }
}

impl Default for HotkeyChord {
    fn default() -> Self {
        Self::new(
            ModifierSet::empty().with(Modifier::Cmd).with(Modifier::Shift),
            'C',
        )
    }
}

impl FromStr for HotkeyChord {
    type Err = PickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HotkeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in self.modifiers.iter() {
            write!(f, "{} + ", m.name())?;
        }
        write!(f, "{}", self.key)
    }
}

impl Serialize for HotkeyChord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HotkeyChord {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HotkeyChord::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A key-down event as reported by the platform keyboard listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub modifiers: ModifierSet,
    /// The key's character (or name for non-character keys).
    pub key: String,
}

impl KeyEvent {
    pub fn new(modifiers: ModifierSet, key: impl Into<String>) -> Self {
        Self {
            modifiers,
            key: key.into(),
        }
    }
}

fn normalize_key_char(c: char) -> char {
    c.to_uppercase().next().unwrap_or(c)
}

/// Compare a live modifier set and key against a chord.
///
/// Modifier order is irrelevant and the key comparison is case-insensitive.
/// Keys that are not a single character never match.
pub fn matches(live_modifiers: ModifierSet, live_key: &str, chord: &HotkeyChord) -> bool {
    let mut chars = live_key.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return false;
    };
    let live = HotkeyChord::new(live_modifiers, c);
    live == *chord
}

/// Holds the active chord. Replacing it affects the next evaluated event.
#[derive(Debug, Clone, Default)]
pub struct HotkeyMatcher {
    chord: HotkeyChord,
}

impl HotkeyMatcher {
    pub fn new(chord: HotkeyChord) -> Self {
        Self { chord }
    }

    pub fn chord(&self) -> &HotkeyChord {
        &self.chord
    }

    /// Replace the chord from its string form. On error the previous chord
    /// stays active.
    pub fn update(&mut self, input: &str) -> PickerResult<HotkeyChord> {
        let chord = HotkeyChord::parse(input)?;
        self.chord = chord;
        Ok(chord)
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.chord.is_triggered_by(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mods(list: &[Modifier]) -> ModifierSet {
        list.iter().copied().collect()
    }

    #[test]
    fn test_parse_canonical() {
        let chord = HotkeyChord::parse("Cmd + Shift + L").unwrap();
        assert_eq!(chord.modifiers, mods(&[Modifier::Cmd, Modifier::Shift]));
        assert_eq!(chord.key, 'L');
    }

    #[test]
    fn test_parse_aliases_and_case() {
        let chord = HotkeyChord::parse("command+ALT +control + l").unwrap();
        assert_eq!(
            chord.modifiers,
            mods(&[Modifier::Cmd, Modifier::Option, Modifier::Ctrl])
        );
        assert_eq!(chord.key, 'L');
    }

    #[test]
    fn test_parse_bare_key_is_allowed() {
        let chord = HotkeyChord::parse("K").unwrap();
        assert!(chord.modifiers.is_empty());
        assert_eq!(chord.key, 'K');
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "Cmd + Shift", "Cmd + LL", "Cmd + A + B", "Cmd + + A", "Hyper + A"] {
            assert!(
                matches!(HotkeyChord::parse(input), Err(PickerError::InvalidChord(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_is_canonical_order() {
        let chord = HotkeyChord::parse("Shift + Ctrl + Cmd + x").unwrap();
        assert_eq!(chord.to_string(), "Cmd + Ctrl + Shift + X");
        assert_eq!(HotkeyChord::parse(&chord.to_string()).unwrap(), chord);
    }

    #[test]
    fn test_default_chord_matches_constant() {
        assert_eq!(HotkeyChord::parse(DEFAULT_HOTKEY).unwrap(), HotkeyChord::default());
        assert!(!HotkeyChord::default().modifiers.is_empty());
    }

    #[test]
    fn test_matches_is_order_independent() {
        let chord = HotkeyChord::parse("Cmd + Shift + L").unwrap();
        let shift_first: ModifierSet = [Modifier::Shift, Modifier::Cmd].into_iter().collect();
        let cmd_first: ModifierSet = [Modifier::Cmd, Modifier::Shift].into_iter().collect();
        assert!(matches(shift_first, "l", &chord));
        assert!(matches(cmd_first, "L", &chord));
    }

    #[test]
    fn test_matches_requires_exact_modifiers() {
        let chord = HotkeyChord::parse("Cmd + Shift + L").unwrap();
        assert!(!matches(mods(&[Modifier::Cmd]), "L", &chord));
        assert!(!matches(
            mods(&[Modifier::Cmd, Modifier::Shift, Modifier::Ctrl]),
            "L",
            &chord
        ));
        assert!(!matches(mods(&[Modifier::Cmd, Modifier::Shift]), "Return", &chord));
    }

    #[test]
    fn test_matcher_update_keeps_previous_on_error() {
        let mut matcher = HotkeyMatcher::default();
        let before = *matcher.chord();
        assert!(matcher.update("Cmd + Nope").is_err());
        assert_eq!(*matcher.chord(), before);

        matcher.update("Ctrl + P").unwrap();
        assert!(matcher.matches(&KeyEvent::new(mods(&[Modifier::Ctrl]), "p")));
    }

    #[test]
    fn test_chord_serde_as_string() {
        let chord = HotkeyChord::parse("Option + 1").unwrap();
        let json = serde_json::to_string(&chord).unwrap();
        assert_eq!(json, "\"Option + 1\"");
        let back: HotkeyChord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chord);
    }
}
