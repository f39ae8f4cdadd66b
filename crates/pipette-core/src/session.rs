//! Tracking session state machine.
//!
//! `SessionController` owns every piece of mutable sampling state: the
//! session flag, the last-known sample, the overlay and the tick
//! subscription. It is driven from one thread only (the engine actor), so
//! nothing here is locked.

use crate::backend::{PointerSource, ScreenSource};
use crate::color::ColorSample;
use crate::config::PickerConfig;
use crate::error::{PickerError, PickerResult};
use crate::events::EventSink;
use crate::geometry::{find_monitor, Monitor};
use crate::hotkey::{HotkeyChord, HotkeyMatcher, KeyEvent};
use crate::magnifier::{normalize_side, MagnifierCapture, DEFAULT_MAGNIFIER_SIDE};
use crate::overlay::{IndicatorStyle, OverlayRenderer, SurfaceFactory};
use crate::sampler::ScreenSampler;
use crate::ticker::{frame_interval, TickSource, TickSubscription};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// Not tracking. Initial state, and the state after every stop.
    #[default]
    Idle,
    /// Sampling on every display tick.
    Tracking,
}

/// Resolves once the session stops, with the last sample taken.
pub type Completion = Box<dyn FnOnce(PickerResult<ColorSample>) + Send>;

/// OS-facing collaborators handed to the controller.
pub struct SessionParts {
    pub screens: Box<dyn ScreenSource>,
    pub pointer: Box<dyn PointerSource>,
    pub surfaces: Box<dyn SurfaceFactory>,
    pub ticks: Box<dyn TickSource>,
    pub sink: Box<dyn EventSink>,
}

/// Tunables, usually taken from `PickerConfig`.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub chord: HotkeyChord,
    pub style: IndicatorStyle,
    pub magnifier_side: u32,
    pub fallback_refresh_hz: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            chord: HotkeyChord::default(),
            style: IndicatorStyle::default(),
            magnifier_side: DEFAULT_MAGNIFIER_SIDE,
            fallback_refresh_hz: 60.0,
        }
    }
}

impl From<&PickerConfig> for SessionSettings {
    fn from(config: &PickerConfig) -> Self {
        Self {
            chord: config.hotkey_chord(),
            style: config.indicator,
            magnifier_side: config.magnifier_side(),
            fallback_refresh_hz: config.fallback_refresh_hz,
        }
    }
}

pub struct SessionController {
    parts: SessionParts,
    settings: SessionSettings,
    matcher: HotkeyMatcher,
    state: SessionState,
    generation: u64,
    last_sample: Option<ColorSample>,
    overlay: Option<OverlayRenderer>,
    subscription: Option<Box<dyn TickSubscription>>,
    interval: Option<Duration>,
    /// Monitor whose overlay could not be created. Not retried until the
    /// pointer leaves it.
    failed_monitor: Option<u32>,
    pending: Option<Completion>,
}

impl SessionController {
    pub fn new(parts: SessionParts, settings: SessionSettings) -> Self {
        let settings = SessionSettings {
            magnifier_side: normalize_side(settings.magnifier_side),
            ..settings
        };
        Self {
            parts,
            matcher: HotkeyMatcher::new(settings.chord),
            settings,
            state: SessionState::Idle,
            generation: 0,
            last_sample: None,
            overlay: None,
            subscription: None,
            interval: None,
            failed_monitor: None,
            pending: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Generation of the current (or most recent) tracking session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_sample(&self) -> Option<&ColorSample> {
        self.last_sample.as_ref()
    }

    pub fn chord(&self) -> &HotkeyChord {
        self.matcher.chord()
    }

    /// Enter Tracking: create the overlay on the monitor under the pointer
    /// and subscribe to display ticks.
    ///
    /// Calling this while already Tracking changes nothing. An extra
    /// completion is kept only if none is pending.
    pub fn start(&mut self, on_result: Option<Completion>) -> PickerResult<()> {
        if self.state == SessionState::Tracking {
            debug!(generation = self.generation, "start ignored, already tracking");
            if self.pending.is_none() {
                self.pending = on_result;
            }
            return Ok(());
        }

        let monitors = self.parts.screens.monitors();
        let pointer = self.parts.pointer.pointer_location();
        let monitor = pointer
            .and_then(|p| find_monitor(&monitors, p))
            .or_else(|| monitors.first())
            .cloned()
            .ok_or(PickerError::ScreenNotFound)?;

        let overlay =
            OverlayRenderer::create(self.parts.surfaces.as_mut(), &monitor, self.settings.style)?;

        self.generation += 1;
        self.subscribe(&monitor);
        self.overlay = Some(overlay);
        self.failed_monitor = None;
        self.pending = on_result;
        self.state = SessionState::Tracking;

        info!(generation = self.generation, monitor = monitor.id, "tracking started");
        self.parts
            .sink
            .log(&format!("color picking started on screen {}", monitor.id));
        Ok(())
    }

    /// Leave Tracking. Stops the ticks, destroys the overlay and resolves a
    /// pending completion. No-op while Idle.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }

        self.unsubscribe();
        if let Some(mut overlay) = self.overlay.take() {
            overlay.destroy();
        }
        self.failed_monitor = None;
        self.state = SessionState::Idle;
        info!(generation = self.generation, "tracking stopped");

        if let Some(done) = self.pending.take() {
            let result = self.last_sample.ok_or(PickerError::CaptureFailed);
            done(result);
        }
    }

    /// Per-tick work. Ticks from another generation, or arriving while
    /// Idle, are dropped. Sampling failures are skipped silently.
    pub fn on_tick(&mut self, generation: u64) {
        if self.state != SessionState::Tracking || generation != self.generation {
            trace!(generation, current = self.generation, "stale tick dropped");
            return;
        }

        let Some(point) = self.parts.pointer.pointer_location() else {
            trace!("pointer location unavailable");
            return;
        };

        let sample = match ScreenSampler::new(self.parts.screens.as_ref()).sample(point) {
            Ok(sample) => sample,
            Err(e) => {
                trace!(x = point.x, y = point.y, error = %e, "tick sample skipped");
                return;
            }
        };

        let on_other_screen = match self.overlay.as_ref() {
            Some(overlay) => overlay.monitor().id != sample.screen_id,
            None => self.failed_monitor != Some(sample.screen_id),
        };
        if on_other_screen {
            self.relocate_overlay(sample.screen_id);
        }

        self.last_sample = Some(sample);
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.update(sample.position, sample.color);
        }
        self.parts.sink.color_updated(&sample);
    }

    /// Emit the last-known sample as saved. Silent when nothing was sampled.
    pub fn save_current_color(&mut self) {
        match self.last_sample {
            Some(sample) => {
                debug!(color = %sample.color, "color saved");
                self.parts.sink.color_saved(sample.color);
            }
            None => debug!("save requested before any sample"),
        }
    }

    /// Evaluate a key-down against the active chord. Returns whether it
    /// triggered a save.
    pub fn on_key(&mut self, event: &KeyEvent) -> bool {
        if !self.matcher.matches(event) {
            return false;
        }
        debug!(key = %event.key, "hotkey matched");
        self.save_current_color();
        true
    }

    /// Replace the save chord. On error the previous chord stays active.
    pub fn update_hotkey(&mut self, chord: &str) -> PickerResult<HotkeyChord> {
        let chord = self.matcher.update(chord)?;
        self.settings.chord = chord;
        info!(%chord, "hotkey updated");
        Ok(chord)
    }

    /// Sample once at the pointer, outside the tick loop.
    pub fn pick_once(&mut self) -> PickerResult<ColorSample> {
        let point = self
            .parts
            .pointer
            .pointer_location()
            .ok_or(PickerError::NotFound)?;
        let sample = ScreenSampler::new(self.parts.screens.as_ref()).sample(point)?;
        self.last_sample = Some(sample);
        Ok(sample)
    }

    /// PNG of the area around a top-left-origin point. Works in any state.
    pub fn magnify(&self, x: f64, y: f64) -> PickerResult<Vec<u8>> {
        MagnifierCapture::new(self.parts.screens.as_ref(), self.settings.magnifier_side)
            .capture(x, y)
    }

    fn subscribe(&mut self, monitor: &Monitor) {
        let interval = frame_interval(monitor.refresh_hz, self.settings.fallback_refresh_hz);
        debug!(?interval, monitor = monitor.id, "subscribing to ticks");
        self.subscription = Some(self.parts.ticks.subscribe(self.generation, interval));
        self.interval = Some(interval);
    }

    fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.interval = None;
    }

    /// Move the overlay to another monitor. The old surface is closed
    /// before the new one is created.
    fn relocate_overlay(&mut self, screen_id: u32) {
        let monitors = self.parts.screens.monitors();
        let Some(monitor) = monitors.into_iter().find(|m| m.id == screen_id) else {
            return;
        };

        if let Some(mut old) = self.overlay.take() {
            old.destroy();
        }
        match OverlayRenderer::create(self.parts.surfaces.as_mut(), &monitor, self.settings.style) {
            Ok(overlay) => {
                debug!(monitor = monitor.id, "overlay moved");
                self.overlay = Some(overlay);
                self.failed_monitor = None;
            }
            Err(e) => {
                warn!(monitor = monitor.id, error = %e, "failed to recreate overlay");
                self.failed_monitor = Some(monitor.id);
                return;
            }
        }

        // Follow the new monitor's refresh rate.
        let interval = frame_interval(monitor.refresh_hz, self.settings.fallback_refresh_hz);
        if self.interval != Some(interval) {
            self.unsubscribe();
            self.subscribe(&monitor);
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{CapturedImage, ColorProfile, Rgb};
    use crate::geometry::{CaptureRect, Point, Rect};
    use crate::hotkey::Modifier;
    use crate::overlay::OverlaySurface;
    use image::{Rgba, RgbaImage};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Create(u32),
        Present(Point, Rgb),
        Close(u32),
        Subscribe(u64),
        Cancel(u64),
    }

    type Ops = Rc<RefCell<Vec<Op>>>;

    struct Desk {
        monitors: Vec<Monitor>,
    }

    impl ScreenSource for Desk {
        fn monitors(&self) -> Vec<Monitor> {
            self.monitors.clone()
        }

        fn capture(&self, monitor: &Monitor, rect: CaptureRect) -> PickerResult<CapturedImage> {
            // Each monitor is filled with a color derived from its id.
            let shade = (monitor.id * 40) as u8;
            Ok(CapturedImage::new(
                RgbaImage::from_pixel(rect.width, rect.height, Rgba([shade, 0, 255, 255])),
                ColorProfile::Srgb,
            ))
        }
    }

    struct Pointer(Rc<Cell<Option<Point>>>);

    impl PointerSource for Pointer {
        fn pointer_location(&self) -> Option<Point> {
            self.0.get()
        }
    }

    struct Surface {
        monitor: u32,
        ops: Ops,
    }

    impl OverlaySurface for Surface {
        fn present(&mut self, center: Point, stroke: Rgb) {
            self.ops.borrow_mut().push(Op::Present(center, stroke));
        }
        fn close(&mut self) {
            self.ops.borrow_mut().push(Op::Close(self.monitor));
        }
    }

    struct Surfaces {
        ops: Ops,
        fail: Rc<Cell<bool>>,
    }

    impl SurfaceFactory for Surfaces {
        fn create_surface(
            &mut self,
            monitor: &Monitor,
            _style: IndicatorStyle,
        ) -> PickerResult<Box<dyn OverlaySurface>> {
            if self.fail.get() {
                return Err(PickerError::CaptureFailed);
            }
            self.ops.borrow_mut().push(Op::Create(monitor.id));
            Ok(Box::new(Surface {
                monitor: monitor.id,
                ops: self.ops.clone(),
            }))
        }
    }

    struct Subscription {
        generation: u64,
        ops: Ops,
    }

    impl TickSubscription for Subscription {
        fn cancel(&mut self) {
            self.ops.borrow_mut().push(Op::Cancel(self.generation));
        }
    }

    struct Ticks(Ops);

    impl TickSource for Ticks {
        fn subscribe(&mut self, generation: u64, _interval: Duration) -> Box<dyn TickSubscription> {
            self.0.borrow_mut().push(Op::Subscribe(generation));
            Box::new(Subscription {
                generation,
                ops: self.0.clone(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct Sink {
        updated: Arc<Mutex<Vec<ColorSample>>>,
        saved: Arc<Mutex<Vec<Rgb>>>,
        logs: Arc<Mutex<Vec<String>>>,
    }

    impl EventSink for Sink {
        fn color_updated(&self, sample: &ColorSample) {
            self.updated.lock().unwrap().push(*sample);
        }
        fn color_saved(&self, color: Rgb) {
            self.saved.lock().unwrap().push(color);
        }
        fn log(&self, line: &str) {
            self.logs.lock().unwrap().push(line.to_string());
        }
    }

    struct Rig {
        session: SessionController,
        ops: Ops,
        pointer: Rc<Cell<Option<Point>>>,
        fail_surfaces: Rc<Cell<bool>>,
        sink: Sink,
    }

    fn monitor(id: u32, x: f64) -> Monitor {
        Monitor {
            id,
            frame: Rect::new(x, 0.0, 1920.0, 1080.0),
            scale_factor: 1.0,
            refresh_hz: 60.0,
        }
    }

    fn rig() -> Rig {
        rig_with(vec![monitor(1, 0.0), monitor(2, 1920.0)])
    }

    fn rig_with(monitors: Vec<Monitor>) -> Rig {
        let ops: Ops = Rc::default();
        let pointer = Rc::new(Cell::new(Some(Point::new(100.0, 100.0))));
        let fail_surfaces = Rc::new(Cell::new(false));
        let sink = Sink::default();
        let parts = SessionParts {
            screens: Box::new(Desk { monitors }),
            pointer: Box::new(Pointer(pointer.clone())),
            surfaces: Box::new(Surfaces {
                ops: ops.clone(),
                fail: fail_surfaces.clone(),
            }),
            ticks: Box::new(Ticks(ops.clone())),
            sink: Box::new(sink.clone()),
        };
        Rig {
            session: SessionController::new(parts, SessionSettings::default()),
            ops,
            pointer,
            fail_surfaces,
            sink,
        }
    }

    fn count(ops: &Ops, pred: impl Fn(&Op) -> bool) -> usize {
        ops.borrow().iter().filter(|op| pred(op)).count()
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut rig = rig();
        rig.session.start(None).unwrap();
        rig.session.start(None).unwrap();

        assert_eq!(rig.session.state(), SessionState::Tracking);
        assert_eq!(rig.session.generation(), 1);
        assert_eq!(count(&rig.ops, |op| matches!(op, Op::Create(_))), 1);
        assert_eq!(count(&rig.ops, |op| matches!(op, Op::Subscribe(_))), 1);
    }

    #[test]
    fn test_tick_updates_overlay_and_emits() {
        let mut rig = rig();
        rig.session.start(None).unwrap();
        rig.session.on_tick(1);

        let updated = rig.sink.updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].color, Rgb::new(40, 0, 255));
        assert_eq!(updated[0].screen_id, 1);
        assert_eq!(rig.session.last_sample().map(|s| s.color), Some(Rgb::new(40, 0, 255)));
        // Stroke has red and blue swapped.
        assert!(rig
            .ops
            .borrow()
            .contains(&Op::Present(Point::new(100.0, 100.0), Rgb::new(255, 0, 40))));
    }

    #[test]
    fn test_tick_after_stop_is_noop() {
        let mut rig = rig();
        rig.session.start(None).unwrap();
        rig.session.stop();
        let before = rig.ops.borrow().len();

        rig.session.on_tick(1);

        assert_eq!(rig.ops.borrow().len(), before);
        assert!(rig.sink.updated.lock().unwrap().is_empty());
        assert_eq!(rig.session.state(), SessionState::Idle);
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let mut rig = rig();
        rig.session.start(None).unwrap();
        rig.session.stop();
        rig.session.start(None).unwrap();
        assert_eq!(rig.session.generation(), 2);

        rig.session.on_tick(1);
        assert!(rig.sink.updated.lock().unwrap().is_empty());

        rig.session.on_tick(2);
        assert_eq!(rig.sink.updated.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_tick_off_screen_is_skipped() {
        let mut rig = rig();
        rig.session.start(None).unwrap();
        rig.pointer.set(Some(Point::new(-50.0, 10.0)));
        rig.session.on_tick(1);
        rig.pointer.set(None);
        rig.session.on_tick(1);

        assert!(rig.sink.updated.lock().unwrap().is_empty());
        assert!(rig.session.last_sample().is_none());
        assert_eq!(rig.session.state(), SessionState::Tracking);
    }

    #[test]
    fn test_stop_releases_everything() {
        let mut rig = rig();
        for _ in 0..3 {
            rig.session.start(None).unwrap();
            rig.session.stop();
        }
        assert_eq!(
            count(&rig.ops, |op| matches!(op, Op::Create(_))),
            count(&rig.ops, |op| matches!(op, Op::Close(_)))
        );
        assert_eq!(
            count(&rig.ops, |op| matches!(op, Op::Subscribe(_))),
            count(&rig.ops, |op| matches!(op, Op::Cancel(_)))
        );
    }

    #[test]
    fn test_stop_resolves_completion() {
        let mut rig = rig();
        let result: Arc<Mutex<Option<PickerResult<ColorSample>>>> = Arc::default();
        let slot = result.clone();
        rig.session
            .start(Some(Box::new(move |r: PickerResult<ColorSample>| {
                *slot.lock().unwrap() = Some(r)
            })))
            .unwrap();
        rig.session.on_tick(1);
        rig.session.stop();

        let got = result.lock().unwrap().take().unwrap().unwrap();
        assert_eq!(got.color, Rgb::new(40, 0, 255));
    }

    #[test]
    fn test_stop_without_sample_fails_completion() {
        let mut rig = rig();
        let result: Arc<Mutex<Option<PickerResult<ColorSample>>>> = Arc::default();
        let slot = result.clone();
        rig.session
            .start(Some(Box::new(move |r: PickerResult<ColorSample>| {
                *slot.lock().unwrap() = Some(r)
            })))
            .unwrap();
        rig.session.stop();

        assert_eq!(
            result.lock().unwrap().take(),
            Some(Err(PickerError::CaptureFailed))
        );
    }

    #[test]
    fn test_start_fails_when_overlay_cannot_be_created() {
        let mut rig = rig();
        rig.fail_surfaces.set(true);
        assert!(rig.session.start(None).is_err());
        assert_eq!(rig.session.state(), SessionState::Idle);
        assert_eq!(count(&rig.ops, |op| matches!(op, Op::Subscribe(_))), 0);
    }

    #[test]
    fn test_overlay_moves_with_pointer_without_overlap() {
        let mut rig = rig();
        rig.session.start(None).unwrap();
        rig.session.on_tick(1);
        rig.pointer.set(Some(Point::new(2500.0, 500.0)));
        rig.session.on_tick(1);

        let ops = rig.ops.borrow();
        let close = ops.iter().position(|op| *op == Op::Close(1)).unwrap();
        let create = ops.iter().position(|op| *op == Op::Create(2)).unwrap();
        assert!(close < create, "old overlay must close first: {ops:?}");
        assert_eq!(rig.session.last_sample().map(|s| s.screen_id), Some(2));
        assert_eq!(
            ops.last(),
            Some(&Op::Present(Point::new(580.0, 500.0), Rgb::new(255, 0, 80)))
        );
    }

    #[test]
    fn test_failed_relocation_is_not_retried_every_tick() {
        let mut rig = rig();
        rig.session.start(None).unwrap();
        rig.session.on_tick(1);
        rig.fail_surfaces.set(true);
        rig.pointer.set(Some(Point::new(2500.0, 500.0)));
        for _ in 0..5 {
            rig.session.on_tick(1);
        }

        assert_eq!(count(&rig.ops, |op| matches!(op, Op::Subscribe(_))), 1);
        assert_eq!(count(&rig.ops, |op| matches!(op, Op::Cancel(_))), 0);
        assert_eq!(count(&rig.ops, |op| matches!(op, Op::Close(_))), 1);
        assert_eq!(rig.session.state(), SessionState::Tracking);
        // Sampling keeps going without an indicator.
        assert_eq!(rig.sink.updated.lock().unwrap().len(), 6);

        // Back on a monitor that works, the overlay comes back.
        rig.fail_surfaces.set(false);
        rig.pointer.set(Some(Point::new(100.0, 100.0)));
        rig.session.on_tick(1);
        assert_eq!(count(&rig.ops, |op| *op == Op::Create(1)), 2);
        assert_eq!(
            rig.ops.borrow().last(),
            Some(&Op::Present(Point::new(100.0, 100.0), Rgb::new(255, 0, 40)))
        );
    }

    #[test]
    fn test_relocation_resubscribes_only_on_refresh_change() {
        let fast = Monitor {
            refresh_hz: 120.0,
            ..monitor(3, 3840.0)
        };
        let mut rig = rig_with(vec![monitor(1, 0.0), monitor(2, 1920.0), fast]);
        rig.session.start(None).unwrap();
        rig.session.on_tick(1);

        rig.pointer.set(Some(Point::new(2500.0, 500.0)));
        rig.session.on_tick(1);
        assert_eq!(count(&rig.ops, |op| matches!(op, Op::Subscribe(_))), 1);

        rig.pointer.set(Some(Point::new(4000.0, 500.0)));
        rig.session.on_tick(1);
        assert_eq!(count(&rig.ops, |op| matches!(op, Op::Subscribe(_))), 2);
        assert_eq!(count(&rig.ops, |op| matches!(op, Op::Cancel(_))), 1);
    }

    #[test]
    fn test_save_without_sample_is_silent() {
        let mut rig = rig();
        rig.session.save_current_color();
        assert!(rig.sink.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn test_save_works_after_stop() {
        let mut rig = rig();
        rig.session.start(None).unwrap();
        rig.session.on_tick(1);
        rig.session.stop();
        rig.session.save_current_color();
        assert_eq!(*rig.sink.saved.lock().unwrap(), vec![Rgb::new(40, 0, 255)]);
    }

    #[test]
    fn test_updated_hotkey_triggers_save() {
        let mut rig = rig();
        rig.session.pick_once().unwrap();
        rig.session.update_hotkey("Cmd + Shift + L").unwrap();

        let cmd_shift: crate::hotkey::ModifierSet =
            [Modifier::Shift, Modifier::Cmd].into_iter().collect();
        let cmd_only: crate::hotkey::ModifierSet = [Modifier::Cmd].into_iter().collect();

        assert!(rig.session.on_key(&KeyEvent::new(cmd_shift, "l")));
        assert!(!rig.session.on_key(&KeyEvent::new(cmd_only, "l")));
        assert_eq!(rig.sink.saved.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_bad_hotkey_keeps_previous() {
        let mut rig = rig();
        let before = *rig.session.chord();
        assert!(matches!(
            rig.session.update_hotkey("Cmd +"),
            Err(PickerError::InvalidChord(_))
        ));
        assert_eq!(*rig.session.chord(), before);
    }

    #[test]
    fn test_magnify_while_idle() {
        let rig = rig();
        let png = rig.session.magnify(0.0, 0.0).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (11, 11));
    }
}
