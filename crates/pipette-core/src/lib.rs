//! pipette-core: screen color sampling engine.
//!
//! Keeps the sampling loop, session state and hotkey handling free of OS
//! calls. Monitors, capture, pointer, overlay surfaces and keyboard input
//! live in `pipette-platform` behind the traits in [`backend`],
//! [`overlay`] and [`ticker`].

pub mod backend;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod hotkey;
pub mod magnifier;
pub mod overlay;
pub mod sampler;
pub mod session;
pub mod ticker;

pub use backend::{PointerSource, ScreenSource};
pub use color::{channel_component, scale_channel, CapturedImage, ColorProfile, ColorSample, Rgb};
pub use config::PickerConfig;
pub use engine::{engine_channel, Engine, EngineCommand, EngineHandle, EngineInbox};
pub use error::{PickerError, PickerResult};
pub use events::{ChannelSink, EventSink, PickerEvent};
pub use geometry::{find_monitor, CaptureRect, Monitor, Point, Rect};
pub use hotkey::{HotkeyChord, HotkeyMatcher, KeyEvent, Modifier, ModifierSet, DEFAULT_HOTKEY};
pub use magnifier::MagnifierCapture;
pub use overlay::{ring_alpha_mask, IndicatorStyle, OverlayRenderer, OverlaySurface, SurfaceFactory};
pub use sampler::ScreenSampler;
pub use session::{Completion, SessionController, SessionParts, SessionSettings, SessionState};
pub use ticker::{ChannelTickSource, FrameTicker, Tick, TickSource, TickSubscription};
