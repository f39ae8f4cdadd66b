//! Outbound notifications: color updates, saves and diagnostic log lines.

use crate::color::{ColorSample, Rgb};
use crossbeam_channel::{Sender, TrySendError};
use serde::Serialize;
use tracing::warn;

/// Events delivered to the command-dispatch side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum PickerEvent {
    ColorUpdated { color: [u8; 3], x: f64, y: f64 },
    ColorSaved { color: [u8; 3] },
    Log { log: String },
}

impl PickerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PickerEvent::ColorUpdated { .. } => "colorUpdated",
            PickerEvent::ColorSaved { .. } => "colorSaved",
            PickerEvent::Log { .. } => "log",
        }
    }
}

/// Receiver of engine notifications, injected at construction.
pub trait EventSink: Send {
    fn color_updated(&self, sample: &ColorSample);
    fn color_saved(&self, color: Rgb);
    fn log(&self, line: &str);
}

/// Forwards events over a channel. Never blocks the engine: when the
/// consumer falls behind, events are dropped with a warning.
#[derive(Clone)]
pub struct ChannelSink {
    tx: Sender<PickerEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<PickerEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, event: PickerEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(event = event.name(), "event queue full, dropping"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl EventSink for ChannelSink {
    fn color_updated(&self, sample: &ColorSample) {
        self.emit(PickerEvent::ColorUpdated {
            color: sample.color.to_array(),
            x: sample.position.x,
            y: sample.position.y,
        });
    }

    fn color_saved(&self, color: Rgb) {
        self.emit(PickerEvent::ColorSaved {
            color: color.to_array(),
        });
    }

    fn log(&self, line: &str) {
        self.emit(PickerEvent::Log {
            log: line.to_string(),
        });
    }
}
