//! Engine actor: the single owner of session and overlay state.
//!
//! Everything that touches the overlay runs on the thread that calls
//! [`Engine::run`]. Other threads hold an [`EngineHandle`] and talk to it
//! over channels; display ticks arrive on their own bounded(1) channel.

use crate::color::ColorSample;
use crate::error::{PickerError, PickerResult};
use crate::hotkey::{HotkeyChord, KeyEvent};
use crate::session::{Completion, SessionController, SessionState};
use crate::ticker::{ChannelTickSource, Tick};
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 64;

/// Commands sent to the engine thread.
pub enum EngineCommand {
    /// Begin tracking. Replies once the overlay exists.
    Start {
        on_result: Option<Completion>,
        reply: Sender<PickerResult<()>>,
    },
    /// Stop tracking.
    Stop,
    /// Emit the last-known sample as saved.
    SaveCurrentColor,
    /// One-shot sample at the pointer.
    PickColor {
        reply: Sender<PickerResult<ColorSample>>,
    },
    /// PNG of the area around a top-left-origin point.
    Magnify {
        x: f64,
        y: f64,
        reply: Sender<PickerResult<Vec<u8>>>,
    },
    /// Replace the save chord.
    UpdateHotkey {
        chord: String,
        reply: Sender<PickerResult<HotkeyChord>>,
    },
    /// Key-down from the global keyboard listener.
    Key(KeyEvent),
    /// Query the session state.
    State { reply: Sender<SessionState> },
    /// Stop tracking and exit the loop.
    Shutdown,
}

impl EngineCommand {
    fn name(&self) -> &'static str {
        match self {
            EngineCommand::Start { .. } => "start",
            EngineCommand::Stop => "stop",
            EngineCommand::SaveCurrentColor => "save_current_color",
            EngineCommand::PickColor { .. } => "pick_color",
            EngineCommand::Magnify { .. } => "magnify",
            EngineCommand::UpdateHotkey { .. } => "update_hotkey",
            EngineCommand::Key(_) => "key",
            EngineCommand::State { .. } => "state",
            EngineCommand::Shutdown => "shutdown",
        }
    }
}

/// Cloneable handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: Sender<EngineCommand>,
}

impl EngineHandle {
    /// Send a command without waiting for it to be handled.
    pub fn send(&self, cmd: EngineCommand) {
        let name = cmd.name();
        if self.cmd_tx.send(cmd).is_err() {
            warn!(command = name, "engine is gone, command dropped");
        }
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> EngineCommand) -> PickerResult<T> {
        let (reply, rx) = bounded(1);
        self.cmd_tx
            .send(build(reply))
            .map_err(|_| PickerError::EngineUnavailable)?;
        rx.recv().map_err(|_| PickerError::EngineUnavailable)
    }

    pub fn start(&self, on_result: Option<Completion>) -> PickerResult<()> {
        self.request(|reply| EngineCommand::Start { on_result, reply })?
    }

    pub fn stop(&self) {
        self.send(EngineCommand::Stop);
    }

    pub fn save_current_color(&self) {
        self.send(EngineCommand::SaveCurrentColor);
    }

    pub fn pick_color(&self) -> PickerResult<ColorSample> {
        self.request(|reply| EngineCommand::PickColor { reply })?
    }

    pub fn magnify(&self, x: f64, y: f64) -> PickerResult<Vec<u8>> {
        self.request(|reply| EngineCommand::Magnify { x, y, reply })?
    }

    pub fn update_hotkey(&self, chord: &str) -> PickerResult<HotkeyChord> {
        let chord = chord.to_string();
        self.request(|reply| EngineCommand::UpdateHotkey { chord, reply })?
    }

    pub fn state(&self) -> PickerResult<SessionState> {
        self.request(|reply| EngineCommand::State { reply })
    }

    /// Forward a key event. Never blocks the listener thread.
    pub fn key(&self, event: KeyEvent) {
        match self.cmd_tx.try_send(EngineCommand::Key(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("engine busy, key event dropped"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }
}

/// Receiving ends of the engine channels, created before the engine so
/// that handles can be passed out first.
pub struct EngineInbox {
    cmd_rx: Receiver<EngineCommand>,
    tick_tx: Sender<Tick>,
    tick_rx: Receiver<Tick>,
}

impl EngineInbox {
    /// Tick source feeding this engine's tick channel.
    pub fn tick_source(&self) -> ChannelTickSource {
        ChannelTickSource::new(self.tick_tx.clone())
    }
}

/// Create the engine command and tick channels.
pub fn engine_channel() -> (EngineHandle, EngineInbox) {
    let (cmd_tx, cmd_rx) = bounded(COMMAND_CAPACITY);
    let (tick_tx, tick_rx) = bounded(1);
    (
        EngineHandle { cmd_tx },
        EngineInbox {
            cmd_rx,
            tick_tx,
            tick_rx,
        },
    )
}

pub struct Engine {
    session: SessionController,
    cmd_rx: Receiver<EngineCommand>,
    tick_rx: Receiver<Tick>,
}

impl Engine {
    pub fn new(inbox: EngineInbox, session: SessionController) -> Self {
        Self {
            session,
            cmd_rx: inbox.cmd_rx,
            tick_rx: inbox.tick_rx,
        }
    }

    /// Run on a dedicated thread. `build` runs on that thread, so the
    /// session's collaborators never cross threads.
    pub fn spawn<F>(build: F) -> (EngineHandle, JoinHandle<()>)
    where
        F: FnOnce(ChannelTickSource) -> SessionController + Send + 'static,
    {
        let (handle, inbox) = engine_channel();
        let thread = thread::spawn(move || {
            let session = build(inbox.tick_source());
            Engine::new(inbox, session).run();
        });
        (handle, thread)
    }

    /// Serve commands and ticks until shutdown or until every handle is
    /// dropped.
    pub fn run(mut self) {
        info!("engine started");
        let cmd_rx = self.cmd_rx.clone();
        let tick_rx = self.tick_rx.clone();

        loop {
            select! {
                recv(cmd_rx) -> msg => match msg {
                    Ok(cmd) => {
                        if !self.handle_command(cmd) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                recv(tick_rx) -> msg => {
                    if let Ok(tick) = msg {
                        self.session.on_tick(tick.generation);
                    }
                }
            }
        }

        self.session.stop();
        info!("engine exiting");
    }

    /// Handle a command. Returns false if the loop should exit.
    fn handle_command(&mut self, cmd: EngineCommand) -> bool {
        debug!(command = cmd.name(), "handling command");

        match cmd {
            EngineCommand::Start { on_result, reply } => {
                let _ = reply.send(self.session.start(on_result));
            }
            EngineCommand::Stop => self.session.stop(),
            EngineCommand::SaveCurrentColor => self.session.save_current_color(),
            EngineCommand::PickColor { reply } => {
                let _ = reply.send(self.session.pick_once());
            }
            EngineCommand::Magnify { x, y, reply } => {
                let _ = reply.send(self.session.magnify(x, y));
            }
            EngineCommand::UpdateHotkey { chord, reply } => {
                let _ = reply.send(self.session.update_hotkey(&chord));
            }
            EngineCommand::Key(event) => {
                self.session.on_key(&event);
            }
            EngineCommand::State { reply } => {
                let _ = reply.send(self.session.state());
            }
            EngineCommand::Shutdown => return false,
        }

        true
    }
}
