//! Display-cadence tick source.
//!
//! A `FrameTicker` runs on its own thread and hands ticks to the engine over
//! a bounded(1) channel with `try_send`: if the engine has not drained the
//! previous tick, the new one is dropped rather than queued.

use crossbeam_channel::{bounded, select, tick, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace};

/// One display-refresh tick for the session that subscribed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// An active tick subscription. Cancelling it stops delivery before returning.
pub trait TickSubscription {
    fn cancel(&mut self);
}

/// Produces tick subscriptions for tracking sessions.
pub trait TickSource {
    fn subscribe(&mut self, generation: u64, interval: Duration) -> Box<dyn TickSubscription>;
}

/// Tick interval for a refresh rate, falling back when the display reports none.
pub fn frame_interval(refresh_hz: f64, fallback_hz: f64) -> Duration {
    let hz = if refresh_hz.is_finite() && refresh_hz > 0.0 {
        refresh_hz
    } else {
        fallback_hz.max(1.0)
    };
    Duration::from_secs_f64(1.0 / hz)
}

/// Background thread emitting `Tick`s at a fixed interval.
pub struct FrameTicker {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FrameTicker {
    pub fn start(interval: Duration, generation: u64, tick_tx: Sender<Tick>) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let thread = thread::spawn(move || {
            debug!(?interval, generation, "frame ticker started");
            let ticker = tick(interval);
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => match tick_tx.try_send(Tick { generation }) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => trace!("previous tick still pending, skipping"),
                        Err(TrySendError::Disconnected(_)) => break,
                    },
                }
            }
            debug!(generation, "frame ticker exiting");
        });

        Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }
    }

    /// Stop the ticker and wait for its thread to exit.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the select with a disconnect.
        self.stop_tx.take();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl TickSubscription for FrameTicker {
    fn cancel(&mut self) {
        self.stop();
    }
}

impl Drop for FrameTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Tick source backed by `FrameTicker` threads feeding one channel.
pub struct ChannelTickSource {
    tick_tx: Sender<Tick>,
}

impl ChannelTickSource {
    pub fn new(tick_tx: Sender<Tick>) -> Self {
        Self { tick_tx }
    }
}

impl TickSource for ChannelTickSource {
    fn subscribe(&mut self, generation: u64, interval: Duration) -> Box<dyn TickSubscription> {
        Box::new(FrameTicker::start(interval, generation, self.tick_tx.clone()))
    }
}
